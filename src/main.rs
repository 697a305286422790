use std::path::Path;
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;

use lumen::loader::ModuleLoader;
use lumen::repl;

#[derive(ClapParser)]
#[command(name = "lumen", about = "The Lumen language interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Lumen file
    Run { file: String },
    /// Print the version
    Version,
    /// About Lumen
    About,
    /// Interactive REPL
    Repl,
}

fn main() {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Run { file } => cmd_run(file),
        Commands::Version => println!("lumen {}", env!("CARGO_PKG_VERSION")),
        Commands::About => {
            println!("Lumen {}", env!("CARGO_PKG_VERSION"));
            println!("A statically-typed functional language with a tree-walking interpreter.");
            println!("Modules resolve against the entry file's directory; sources end in .lu.");
        }
        Commands::Repl => repl::run(),
    }
}

fn cmd_run(file: &str) {
    let path = Path::new(file);
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut loader = ModuleLoader::new(base_dir);
    if let Err(err) = loader.run_file(path) {
        // Type/runtime/parse errors arrive fully rendered with their own
        // coloring; loader-level failures get the plain header.
        match &err {
            lumen::loader::LoaderError::Parse(msg)
            | lumen::loader::LoaderError::Type(msg)
            | lumen::loader::LoaderError::Runtime(msg) => eprintln!("{}", msg),
            other => eprintln!("{} {}", "error:".red().bold(), other),
        }
        process::exit(1);
    }
}
