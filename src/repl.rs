/// Interactive REPL.
///
/// Keeps one loader and one pair of prelude-seeded environments alive for
/// the whole session, so definitions persist across inputs. Statements are
/// type-checked against the persistent type environment before they run.
use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::interpreter::Interpreter;
use crate::loader::ModuleLoader;
use crate::parser::Parser;
use crate::types::checker;
use crate::value::{repr, Value};

fn help() {
    println!("Commands:");
    println!("  :help / :h   Show this help");
    println!("  :quit / :q   Exit the REPL");
    println!("  :env         Show names defined this session");
    println!();
    println!("An unbalanced line continues on the next prompt.");
}

/// Braces, brackets, and parens left open by `source`.
fn open_delimiters(source: &str) -> i32 {
    let mut depth = 0;
    let mut in_str = false;
    let mut prev = '\0';
    for c in source.chars() {
        if in_str {
            if c == '"' && prev != '\\' {
                in_str = false;
            }
        } else {
            match c {
                '"' => in_str = true,
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                _ => {}
            }
        }
        prev = c;
    }
    depth
}

pub fn run() {
    let mut loader = ModuleLoader::new(".");
    let (type_env, value_env) = loader.prelude_envs();

    println!("Lumen {} — :help for commands", env!("CARGO_PKG_VERSION"));

    let stdin = io::stdin();
    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() { ">> " } else { ".. " };
        print!("{}", prompt);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                break;
            }
        }

        if pending.is_empty() {
            match line.trim() {
                ":quit" | ":q" => break,
                ":help" | ":h" => {
                    help();
                    continue;
                }
                ":env" => {
                    for name in value_env.local_names() {
                        if let Some(value) = value_env.get(&name) {
                            println!("  {} = {}", name, repr(&value));
                        }
                    }
                    continue;
                }
                "" => continue,
                _ => {}
            }
        }

        pending.push_str(&line);
        if open_delimiters(&pending) > 0 {
            continue;
        }
        let source = std::mem::take(&mut pending);

        let mut parser = Parser::from_source(&source);
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            for err in parser.errors() {
                eprintln!("{} {}", "parse error".red().bold(), err);
            }
            continue;
        }

        for stmt in &program.statements {
            match checker::check_stmt_in(stmt, &type_env, &mut loader) {
                Ok(_) => {}
                Err(err) => {
                    eprintln!("{} {}", "error:".red().bold(), err.message.red());
                    continue;
                }
            }
            let mut interp = Interpreter::new(&mut loader);
            match interp.eval_stmt(stmt, &value_env) {
                Ok(Value::Null) => {}
                Ok(value) => println!("{}", repr(&value)),
                Err(err) => {
                    eprintln!("{} {}", "error:".red().bold(), err.to_string().red());
                }
            }
        }
    }
}
