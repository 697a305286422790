/// Global builtins and the value-side prelude.
///
/// Builtins are dispatched by name; anything this module does not own is
/// handed to the native service registry (`services::dispatch`).
use std::rc::Rc;

use crate::lexer::Token;
use crate::services;
use crate::value::{repr, Env, RuntimeError, Value};

use super::Interpreter;

/// Seed a fresh module value environment: builtins, `NULL`, and the
/// `Result`/`Option` constructors with their variant→sum mapping.
pub fn seed_value_prelude(env: &Env) {
    for name in [
        "len", "toString", "writeln", "write", "strFormat", "map", "filter", "reduce", "first",
        "rest", "prepend",
    ] {
        env.define(name, Value::Builtin(name.to_string()), false);
    }
    env.define("NULL", Value::Null, false);

    env.define_ctor("Ok", Value::Builtin("ctor:Result.Ok/1".to_string()));
    env.define_ctor("Err", Value::Builtin("ctor:Result.Err/1".to_string()));
    env.define_ctor("Some", Value::Builtin("ctor:Option.Some/1".to_string()));
    env.define_ctor("None", Value::none());
    env.map_variant("Ok", "Result");
    env.map_variant("Err", "Result");
    env.map_variant("Some", "Option");
    env.map_variant("None", "Option");
}

impl Interpreter<'_> {
    pub(crate) fn call_builtin(
        &mut self,
        name: &str,
        args: Vec<Value>,
        token: &Token,
    ) -> Result<Value, RuntimeError> {
        match name {
            "len" => {
                let [arg] = fixed::<1>(name, args, token)?;
                match &arg {
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    Value::Array(items) => Ok(Value::Int(items.len() as i64)),
                    Value::Tuple(items) => Ok(Value::Int(items.len() as i64)),
                    Value::Hash(entries) => Ok(Value::Int(entries.borrow().len() as i64)),
                    other => Err(RuntimeError::at(
                        format!("len does not apply to {}", other.type_name()),
                        token,
                    )),
                }
            }
            "toString" => {
                let [arg] = fixed::<1>(name, args, token)?;
                Ok(Value::Str(repr(&arg)))
            }
            "writeln" => {
                let parts: Vec<String> = args.iter().map(repr).collect();
                println!("{}", parts.join(" "));
                Ok(Value::Null)
            }
            "write" => {
                let parts: Vec<String> = args.iter().map(repr).collect();
                print!("{}", parts.join(" "));
                Ok(Value::Null)
            }
            "strFormat" => {
                let mut iter = args.into_iter();
                let fmt = match iter.next() {
                    Some(Value::Str(s)) => s,
                    Some(other) => {
                        return Err(RuntimeError::at(
                            format!("strFormat expects a String format, found {}", other.type_name()),
                            token,
                        ))
                    }
                    None => {
                        return Err(RuntimeError::at(
                            "strFormat expects a format string as its first argument",
                            token,
                        ))
                    }
                };
                let mut out = String::new();
                let mut rest = fmt.as_str();
                for arg in iter {
                    match rest.split_once("{?}") {
                        Some((before, after)) => {
                            out.push_str(before);
                            out.push_str(&repr(&arg));
                            rest = after;
                        }
                        // Surplus arguments are dropped once placeholders
                        // run out.
                        None => break,
                    }
                }
                out.push_str(rest);
                Ok(Value::Str(out))
            }
            "map" => {
                let [arr, f] = fixed::<2>(name, args, token)?;
                let items = array_arg("map", &arr, token)?;
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    out.push(self.call_value(f.clone(), vec![item.clone()], token)?);
                }
                Ok(Value::Array(Rc::new(out)))
            }
            "filter" => {
                let [arr, f] = fixed::<2>(name, args, token)?;
                let items = array_arg("filter", &arr, token)?;
                let mut out = Vec::new();
                for item in items.iter() {
                    let keep = self.call_value(f.clone(), vec![item.clone()], token)?;
                    if keep.is_truthy() {
                        out.push(item.clone());
                    }
                }
                Ok(Value::Array(Rc::new(out)))
            }
            "reduce" => {
                let [arr, init, f] = fixed::<3>(name, args, token)?;
                let items = array_arg("reduce", &arr, token)?;
                let mut acc = init;
                for item in items.iter() {
                    acc = self.call_value(f.clone(), vec![acc, item.clone()], token)?;
                }
                Ok(acc)
            }
            "first" => {
                let [arr] = fixed::<1>(name, args, token)?;
                let items = array_arg("first", &arr, token)?;
                items
                    .first()
                    .cloned()
                    .ok_or_else(|| RuntimeError::at("first on an empty array", token))
            }
            "rest" => {
                let [arr] = fixed::<1>(name, args, token)?;
                let items = array_arg("rest", &arr, token)?;
                if items.is_empty() {
                    return Err(RuntimeError::at("rest on an empty array", token));
                }
                Ok(Value::Array(Rc::new(items[1..].to_vec())))
            }
            "prepend" => {
                let [head, arr] = fixed::<2>(name, args, token)?;
                let items = array_arg("prepend", &arr, token)?;
                let mut out = Vec::with_capacity(items.len() + 1);
                out.push(head);
                out.extend(items.iter().cloned());
                Ok(Value::Array(Rc::new(out)))
            }
            _ => services::dispatch(self, name, args, token),
        }
    }
}

fn fixed<const N: usize>(
    name: &str,
    args: Vec<Value>,
    token: &Token,
) -> Result<[Value; N], RuntimeError> {
    let got = args.len();
    args.try_into().map_err(|_| {
        RuntimeError::at(
            format!("{} expects {} argument(s), got {}", name, N, got),
            token,
        )
    })
}

fn array_arg<'v>(
    name: &str,
    value: &'v Value,
    token: &Token,
) -> Result<&'v Rc<Vec<Value>>, RuntimeError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(RuntimeError::at(
            format!("{} expects an Array, found {}", name, other.type_name()),
            token,
        )),
    }
}
