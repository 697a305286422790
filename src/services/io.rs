/// `io` — stdin/stdout access.
use std::io::{self, BufRead, Write};

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{Env, RuntimeError, Value};

use super::{arity, define_fn, result_of, str_arg};

pub fn register(types: &TypeEnv, values: &Env, prelude: &Prelude) {
    define_fn(
        types,
        values,
        "io.readLine",
        vec![],
        result_of(prelude, Type::Str),
    );
    define_fn(
        types,
        values,
        "io.prompt",
        vec![Type::Str],
        result_of(prelude, Type::Str),
    );
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    match name {
        "io.readLine" => Some(read_line(args)),
        "io.prompt" => Some(prompt(args)),
        _ => None,
    }
}

fn read_stdin_line() -> Value {
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => Value::err(Value::Str("end of input".to_string())),
        Ok(_) => {
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Value::ok(Value::Str(line))
        }
        Err(e) => Value::err(Value::Str(e.to_string())),
    }
}

fn read_line(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 0, "io.readLine")?;
    Ok(read_stdin_line())
}

fn prompt(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "io.prompt")?;
    let text = str_arg(args, 0, "prompt")?;
    print!("{}", text);
    let _ = io::stdout().flush();
    Ok(read_stdin_line())
}
