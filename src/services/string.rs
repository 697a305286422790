/// `string` — string routines.
use std::rc::Rc;

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{Env, RuntimeError, Value};

use super::{arity, define_fn, int_arg, result_of, str_arg};

pub fn register(types: &TypeEnv, values: &Env, prelude: &Prelude) {
    let s = || Type::Str;
    let arr = || Type::Array(Box::new(Type::Str));

    define_fn(types, values, "string.upper", vec![s()], s());
    define_fn(types, values, "string.lower", vec![s()], s());
    define_fn(types, values, "string.trim", vec![s()], s());
    define_fn(types, values, "string.split", vec![s(), s()], arr());
    define_fn(types, values, "string.join", vec![arr(), s()], s());
    define_fn(types, values, "string.contains", vec![s(), s()], Type::Boolean);
    define_fn(types, values, "string.replace", vec![s(), s(), s()], s());
    define_fn(types, values, "string.startsWith", vec![s(), s()], Type::Boolean);
    define_fn(types, values, "string.endsWith", vec![s(), s()], Type::Boolean);
    define_fn(types, values, "string.repeat", vec![s(), Type::Integer], s());
    define_fn(
        types,
        values,
        "string.slice",
        vec![s(), Type::Integer, Type::Integer],
        s(),
    );
    define_fn(types, values, "string.chars", vec![s()], arr());
    define_fn(
        types,
        values,
        "string.toInteger",
        vec![s()],
        result_of(prelude, Type::Integer),
    );
    define_fn(
        types,
        values,
        "string.toDouble",
        vec![s()],
        result_of(prelude, Type::Double),
    );
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    let result = match name {
        "string.upper" => map_str(name, args, |s| s.to_uppercase()),
        "string.lower" => map_str(name, args, |s| s.to_lowercase()),
        "string.trim" => map_str(name, args, |s| s.trim().to_string()),
        "string.split" => split(args),
        "string.join" => join(args),
        "string.contains" => predicate(name, args, |s, n| s.contains(n)),
        "string.startsWith" => predicate(name, args, |s, n| s.starts_with(n)),
        "string.endsWith" => predicate(name, args, |s, n| s.ends_with(n)),
        "string.replace" => replace(args),
        "string.repeat" => repeat(args),
        "string.slice" => slice(args),
        "string.chars" => chars(args),
        "string.toInteger" => to_integer(args),
        "string.toDouble" => to_double(args),
        _ => return None,
    };
    Some(result)
}

fn map_str(name: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, RuntimeError> {
    arity(args, 1, name)?;
    Ok(Value::Str(f(&str_arg(args, 0, "text")?)))
}

fn predicate(
    name: &str,
    args: &[Value],
    f: impl Fn(&str, &str) -> bool,
) -> Result<Value, RuntimeError> {
    arity(args, 2, name)?;
    let text = str_arg(args, 0, "text")?;
    let needle = str_arg(args, 1, "needle")?;
    Ok(Value::Bool(f(&text, &needle)))
}

fn split(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2, "string.split")?;
    let text = str_arg(args, 0, "text")?;
    let sep = str_arg(args, 1, "separator")?;
    let parts: Vec<Value> = if sep.is_empty() {
        text.chars().map(|c| Value::Str(c.to_string())).collect()
    } else {
        text.split(&sep).map(|p| Value::Str(p.to_string())).collect()
    };
    Ok(Value::Array(Rc::new(parts)))
}

fn join(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2, "string.join")?;
    let items = match &args[0] {
        Value::Array(items) => items,
        other => {
            return Err(RuntimeError::msg(format!(
                "string.join expects an Array, found {}",
                other.type_name()
            )))
        }
    };
    let sep = str_arg(args, 1, "separator")?;
    let mut parts = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Value::Str(s) => parts.push(s.clone()),
            other => {
                return Err(RuntimeError::msg(format!(
                    "string.join expects String elements, found {}",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::Str(parts.join(&sep)))
}

fn replace(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 3, "string.replace")?;
    let text = str_arg(args, 0, "text")?;
    let from = str_arg(args, 1, "from")?;
    let to = str_arg(args, 2, "to")?;
    Ok(Value::Str(text.replace(&from, &to)))
}

fn repeat(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2, "string.repeat")?;
    let text = str_arg(args, 0, "text")?;
    let count = int_arg(args, 1, "count")?;
    if count < 0 {
        return Err(RuntimeError::msg("string.repeat count must not be negative"));
    }
    Ok(Value::Str(text.repeat(count as usize)))
}

fn slice(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 3, "string.slice")?;
    let text = str_arg(args, 0, "text")?;
    let chars: Vec<char> = text.chars().collect();
    let start = int_arg(args, 1, "start")?.max(0) as usize;
    let end = (int_arg(args, 2, "end")?.max(0) as usize).min(chars.len());
    if start >= end {
        return Ok(Value::Str(String::new()));
    }
    Ok(Value::Str(chars[start..end].iter().collect()))
}

fn chars(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "string.chars")?;
    let text = str_arg(args, 0, "text")?;
    Ok(Value::Array(Rc::new(
        text.chars().map(|c| Value::Str(c.to_string())).collect(),
    )))
}

fn to_integer(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "string.toInteger")?;
    let text = str_arg(args, 0, "text")?;
    Ok(match text.trim().parse::<i64>() {
        Ok(i) => Value::ok(Value::Int(i)),
        Err(_) => Value::err(Value::Str(format!("'{}' is not an Integer", text))),
    })
}

fn to_double(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "string.toDouble")?;
    let text = str_arg(args, 0, "text")?;
    Ok(match text.trim().parse::<f64>() {
        Ok(d) => Value::ok(Value::Double(d)),
        Err(_) => Value::err(Value::Str(format!("'{}' is not a Double", text))),
    })
}
