/// `hash` — hash-table helpers and classic string digests.
use std::rc::Rc;

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{hash_key, Env, RuntimeError, Value};

use super::{arity, define_fn, str_arg};

pub fn register(types: &TypeEnv, values: &Env, _prelude: &Prelude) {
    let generic_hash = || Type::Hash(Box::new(Type::var("K")), Box::new(Type::var("V")));
    let kv = || {
        vec![
            ("K".to_string(), Vec::new()),
            ("V".to_string(), Vec::new()),
        ]
    };
    let generic = |params: Vec<Type>, ret: Type| Type::Function {
        params,
        ret: Box::new(ret),
        type_params: kv(),
    };

    types.define(
        "keys",
        generic(vec![generic_hash()], Type::Array(Box::new(Type::var("K")))),
        false,
    );
    values.define("keys", Value::Builtin("hash.keys".to_string()), false);
    types.define(
        "values",
        generic(vec![generic_hash()], Type::Array(Box::new(Type::var("V")))),
        false,
    );
    values.define("values", Value::Builtin("hash.values".to_string()), false);
    types.define(
        "has",
        generic(vec![generic_hash(), Type::var("K")], Type::Boolean),
        false,
    );
    values.define("has", Value::Builtin("hash.has".to_string()), false);
    types.define(
        "remove",
        generic(vec![generic_hash(), Type::var("K")], Type::Boolean),
        false,
    );
    values.define("remove", Value::Builtin("hash.remove".to_string()), false);
    types.define(
        "size",
        generic(vec![generic_hash()], Type::Integer),
        false,
    );
    values.define("size", Value::Builtin("hash.size".to_string()), false);

    define_fn(types, values, "hash.fnv1a", vec![Type::Str], Type::Integer);
    define_fn(types, values, "hash.djb2", vec![Type::Str], Type::Integer);
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    let result = match name {
        "hash.keys" => keys(args),
        "hash.values" => values_of(args),
        "hash.has" => has(args),
        "hash.remove" => remove(args),
        "hash.size" => size(args),
        "hash.fnv1a" => fnv1a(args),
        "hash.djb2" => djb2(args),
        _ => return None,
    };
    Some(result)
}

fn hash_arg<'v>(
    args: &'v [Value],
    name: &str,
) -> Result<&'v Rc<std::cell::RefCell<std::collections::BTreeMap<String, (Value, Value)>>>, RuntimeError>
{
    match args.first() {
        Some(Value::Hash(entries)) => Ok(entries),
        Some(other) => Err(RuntimeError::msg(format!(
            "{} expects a Hash, found {}",
            name,
            other.type_name()
        ))),
        None => Err(RuntimeError::msg(format!("{} expects a Hash argument", name))),
    }
}

fn keys(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "hash.keys")?;
    let entries = hash_arg(args, "hash.keys")?;
    let out: Vec<Value> = entries.borrow().values().map(|(k, _)| k.clone()).collect();
    Ok(Value::Array(Rc::new(out)))
}

fn values_of(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "hash.values")?;
    let entries = hash_arg(args, "hash.values")?;
    let out: Vec<Value> = entries.borrow().values().map(|(_, v)| v.clone()).collect();
    Ok(Value::Array(Rc::new(out)))
}

fn has(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2, "hash.has")?;
    let entries = hash_arg(args, "hash.has")?;
    let key = hash_key(&args[1])?;
    Ok(Value::Bool(entries.borrow().contains_key(&key)))
}

fn remove(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2, "hash.remove")?;
    let entries = hash_arg(args, "hash.remove")?;
    let key = hash_key(&args[1])?;
    Ok(Value::Bool(entries.borrow_mut().remove(&key).is_some()))
}

fn size(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "hash.size")?;
    let entries = hash_arg(args, "hash.size")?;
    let len = entries.borrow().len() as i64;
    Ok(Value::Int(len))
}

fn fnv1a(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "hash.fnv1a")?;
    let text = str_arg(args, 0, "text")?;
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    Ok(Value::Int(hash as i64))
}

fn djb2(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "hash.djb2")?;
    let text = str_arg(args, 0, "text")?;
    let mut hash: u64 = 5381;
    for byte in text.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(*byte));
    }
    Ok(Value::Int(hash as i64))
}
