/// Lumen module loader.
///
/// Resolves dotted module names to source files under a base directory,
/// detects import cycles through a loading stack, memoizes loaded modules
/// for the life of the process, and seeds every module with the prelude.
/// Native modules come from an in-memory registry and bypass parsing.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::ast::Program;
use crate::diagnostics;
use crate::interpreter::{seed_value_prelude, Interpreter};
use crate::parser;
use crate::types::checker::{check_program, seed_prelude, Prelude, SemanticError};
use crate::types::env::TypeEnv;
use crate::value::{Env, RuntimeError};
use crate::services;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("circular module dependency: {0}")]
    Cycle(String),
    #[error("unknown module '{0}'")]
    Unknown(String),
    #[error("cannot read module '{name}': {reason}")]
    Unreadable { name: String, reason: String },
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Type(String),
    #[error("{0}")]
    Runtime(String),
}

/// A loaded module: its program (absent for natives) and both environments,
/// cached for the process lifetime.
#[derive(Clone)]
pub struct LoadedModule {
    pub name: String,
    pub program: Option<Rc<Program>>,
    pub type_env: TypeEnv,
    pub value_env: Env,
}

pub struct ModuleLoader {
    base_dir: PathBuf,
    cache: HashMap<String, LoadedModule>,
    loading: Vec<String>,
    prelude: Prelude,
}

impl ModuleLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ModuleLoader {
            base_dir: base_dir.into(),
            cache: HashMap::new(),
            loading: Vec::new(),
            prelude: Prelude::new(),
        }
    }

    pub fn prelude(&self) -> &Prelude {
        &self.prelude
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Fresh environments seeded with the prelude; the REPL builds its
    /// persistent scope from these.
    pub fn prelude_envs(&self) -> (TypeEnv, Env) {
        let tenv = TypeEnv::new();
        seed_prelude(&tenv, &self.prelude);
        let venv = Env::new();
        seed_value_prelude(&venv);
        (tenv, venv)
    }

    /// Load `name` (dotted form), honoring the cache and the loading stack.
    pub fn load(&mut self, name: &str) -> Result<LoadedModule, LoaderError> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(cached.clone());
        }
        if self.loading.iter().any(|n| n == name) {
            let mut chain = self.loading.clone();
            chain.push(name.to_string());
            return Err(LoaderError::Cycle(chain.join(" -> ")));
        }

        self.loading.push(name.to_string());
        let result = self.load_uncached(name);
        self.loading.pop();

        let module = result?;
        self.cache.insert(name.to_string(), module.clone());
        Ok(module)
    }

    fn load_uncached(&mut self, name: &str) -> Result<LoadedModule, LoaderError> {
        if services::is_native(name) {
            let (type_env, value_env) = services::native_module(name, &self.prelude)
                .ok_or_else(|| LoaderError::Unknown(name.to_string()))?;
            return Ok(LoadedModule {
                name: name.to_string(),
                program: None,
                type_env,
                value_env,
            });
        }

        let path = self
            .base_dir
            .join(name.replace('.', "/"))
            .with_extension("lu");
        if !path.is_file() {
            return Err(LoaderError::Unknown(name.to_string()));
        }
        let source = fs::read_to_string(&path).map_err(|e| LoaderError::Unreadable {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.load_source(name, &path, &source)
    }

    /// Run a file directly (CLI entry point). The module is cached under its
    /// file stem so sibling imports resolve to the same instance.
    pub fn run_file(&mut self, path: &Path) -> Result<LoadedModule, LoaderError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("main")
            .to_string();
        let source = fs::read_to_string(path).map_err(|e| LoaderError::Unreadable {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        self.loading.push(name.clone());
        let result = self.load_source(&name, path, &source);
        self.loading.pop();
        let module = result?;
        self.cache.insert(name.clone(), module.clone());
        Ok(module)
    }

    /// Lex, parse, type-check, and evaluate one user module.
    fn load_source(
        &mut self,
        name: &str,
        path: &Path,
        source: &str,
    ) -> Result<LoadedModule, LoaderError> {
        let display_path = path.display().to_string();

        let program = match parser::parse(source) {
            Ok(p) => p,
            Err(errors) => {
                let rendered: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: parse error {}", display_path, e))
                    .collect();
                return Err(LoaderError::Parse(rendered.join("\n")));
            }
        };

        let type_env = TypeEnv::new();
        seed_prelude(&type_env, &self.prelude);
        if let Err(err) = check_program(&program, &type_env, self) {
            return Err(LoaderError::Type(render_semantic(&err, &display_path, source)));
        }

        let value_env = Env::new();
        seed_value_prelude(&value_env);
        let mut interp = Interpreter::new(self);
        if let Err(err) = interp.eval_program(&program, &value_env) {
            return Err(LoaderError::Runtime(render_runtime(
                &err,
                &display_path,
                source,
            )));
        }

        Ok(LoadedModule {
            name: name.to_string(),
            program: Some(Rc::new(program)),
            type_env,
            value_env,
        })
    }
}

fn render_semantic(err: &SemanticError, path: &str, source: &str) -> String {
    let (span, width) = match &err.token {
        Some(tok) => (
            Some((tok.line, tok.column)),
            tok.literal.chars().count().max(1),
        ),
        None => (None, 1),
    };
    diagnostics::render(&err.message, path, span, width, source)
}

fn render_runtime(err: &RuntimeError, path: &str, source: &str) -> String {
    match err {
        RuntimeError::Error { message, span } => {
            diagnostics::render(message, path, *span, 1, source)
        }
        RuntimeError::Return(_) => {
            diagnostics::render("'return' outside of a function", path, None, 1, source)
        }
    }
}
