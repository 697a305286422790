/// Native modules.
///
/// A fixed registry resolved by the loader without parsing: each module
/// seeds a fresh type environment with its exported types and signatures
/// and a fresh value environment with host-backed builtins. Builtin calls
/// are dispatched by namespaced name (`fs.readFile`); each service answers
/// `Some(result)` for the names it owns.
pub mod datetime;
pub mod fs;
pub mod hash;
pub mod http;
pub mod io;
pub mod json;
pub mod math;
pub mod sqlite;
pub mod string;

use crate::interpreter::Interpreter;
use crate::lexer::Token;
use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{Env, RuntimeError, Value};

pub const NATIVE_MODULES: &[&str] = &[
    "fs", "io", "net.http", "json", "math", "string", "hash", "datetime", "sqlite",
];

pub fn is_native(name: &str) -> bool {
    NATIVE_MODULES.contains(&name)
}

/// Build the two tables of a native module; all names are exposed.
pub fn native_module(name: &str, prelude: &Prelude) -> Option<(TypeEnv, Env)> {
    let types = TypeEnv::new();
    let values = Env::new();
    match name {
        "fs" => fs::register(&types, &values, prelude),
        "io" => io::register(&types, &values, prelude),
        "net.http" => http::register(&types, &values, prelude),
        "json" => json::register(&types, &values, prelude),
        "math" => math::register(&types, &values, prelude),
        "string" => string::register(&types, &values, prelude),
        "hash" => hash::register(&types, &values, prelude),
        "datetime" => datetime::register(&types, &values, prelude),
        "sqlite" => sqlite::register(&types, &values, prelude),
        _ => return None,
    }
    Some((types, values))
}

/// Route a namespaced builtin to the service that owns it. The interpreter
/// (and through it the loader) is part of the contract even though the
/// current services are loader-independent.
pub fn dispatch(
    _interp: &mut Interpreter,
    name: &str,
    args: Vec<Value>,
    token: &Token,
) -> Result<Value, RuntimeError> {
    let result = fs::call(name, &args)
        .or_else(|| io::call(name, &args))
        .or_else(|| http::call(name, &args))
        .or_else(|| json::call(name, &args))
        .or_else(|| math::call(name, &args))
        .or_else(|| string::call(name, &args))
        .or_else(|| hash::call(name, &args))
        .or_else(|| datetime::call(name, &args))
        .or_else(|| sqlite::call(name, &args));
    match result {
        Some(r) => r.map_err(|e| match e {
            RuntimeError::Error {
                message,
                span: None,
            } => RuntimeError::at(message, token),
            other => other,
        }),
        None => Err(RuntimeError::at(
            format!("unknown builtin '{}'", name),
            token,
        )),
    }
}

// ---------------------------------------------------------------------------
// Shared signature and argument helpers
// ---------------------------------------------------------------------------

/// `Result<ok, String>` against the shared prelude declaration.
pub(crate) fn result_of(prelude: &Prelude, ok: Type) -> Type {
    Type::Sum {
        decl: std::rc::Rc::clone(&prelude.result),
        type_args: vec![ok, Type::Str],
    }
}

pub(crate) fn define_fn(types: &TypeEnv, values: &Env, name: &str, params: Vec<Type>, ret: Type) {
    types.define(
        name.rsplit('.').next().unwrap_or(name),
        Type::function(params, ret),
        false,
    );
    values.define(
        name.rsplit('.').next().unwrap_or(name),
        Value::Builtin(name.to_string()),
        false,
    );
}

pub(crate) fn str_arg(args: &[Value], index: usize, what: &str) -> Result<String, RuntimeError> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(other) => Err(RuntimeError::msg(format!(
            "{} must be a String, found {}",
            what,
            other.type_name()
        ))),
        None => Err(RuntimeError::msg(format!("missing argument: {}", what))),
    }
}

pub(crate) fn int_arg(args: &[Value], index: usize, what: &str) -> Result<i64, RuntimeError> {
    match args.get(index) {
        Some(Value::Int(i)) => Ok(*i),
        Some(other) => Err(RuntimeError::msg(format!(
            "{} must be an Integer, found {}",
            what,
            other.type_name()
        ))),
        None => Err(RuntimeError::msg(format!("missing argument: {}", what))),
    }
}

pub(crate) fn double_arg(args: &[Value], index: usize, what: &str) -> Result<f64, RuntimeError> {
    match args.get(index) {
        Some(Value::Int(i)) => Ok(*i as f64),
        Some(Value::Double(d)) => Ok(*d),
        Some(other) => Err(RuntimeError::msg(format!(
            "{} must be numeric, found {}",
            what,
            other.type_name()
        ))),
        None => Err(RuntimeError::msg(format!("missing argument: {}", what))),
    }
}

pub(crate) fn arity(args: &[Value], expected: usize, name: &str) -> Result<(), RuntimeError> {
    if args.len() != expected {
        Err(RuntimeError::msg(format!(
            "{} expects {} argument(s), got {}",
            name,
            expected,
            args.len()
        )))
    } else {
        Ok(())
    }
}
