/// `fs` — filesystem access over `std::fs`.
///
/// Every fallible operation returns `Result<_, String>`; the error side is
/// the host error text.
use std::fs;
use std::rc::Rc;

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{Env, RuntimeError, Value};

use super::{arity, define_fn, result_of, str_arg};

pub fn register(types: &TypeEnv, values: &Env, prelude: &Prelude) {
    let str_result = || result_of(prelude, Type::Str);
    let null_result = || result_of(prelude, Type::Null);
    let list_result = || result_of(prelude, Type::Array(Box::new(Type::Str)));

    define_fn(types, values, "fs.readFile", vec![Type::Str], str_result());
    define_fn(
        types,
        values,
        "fs.writeFile",
        vec![Type::Str, Type::Str],
        null_result(),
    );
    define_fn(
        types,
        values,
        "fs.appendFile",
        vec![Type::Str, Type::Str],
        null_result(),
    );
    define_fn(types, values, "fs.exists", vec![Type::Str], Type::Boolean);
    define_fn(types, values, "fs.listDir", vec![Type::Str], list_result());
    define_fn(types, values, "fs.makeDir", vec![Type::Str], null_result());
    define_fn(types, values, "fs.remove", vec![Type::Str], null_result());
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    match name {
        "fs.readFile" => Some(read_file(args)),
        "fs.writeFile" => Some(write_file(args, false)),
        "fs.appendFile" => Some(write_file(args, true)),
        "fs.exists" => Some(exists(args)),
        "fs.listDir" => Some(list_dir(args)),
        "fs.makeDir" => Some(make_dir(args)),
        "fs.remove" => Some(remove(args)),
        _ => None,
    }
}

fn host_result(result: Result<Value, String>) -> Result<Value, RuntimeError> {
    Ok(match result {
        Ok(v) => Value::ok(v),
        Err(e) => Value::err(Value::Str(e)),
    })
}

fn read_file(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "fs.readFile")?;
    let path = str_arg(args, 0, "path")?;
    host_result(fs::read_to_string(&path).map(Value::Str).map_err(|e| e.to_string()))
}

fn write_file(args: &[Value], append: bool) -> Result<Value, RuntimeError> {
    arity(args, 2, if append { "fs.appendFile" } else { "fs.writeFile" })?;
    let path = str_arg(args, 0, "path")?;
    let content = str_arg(args, 1, "content")?;
    let result = if append {
        use std::io::Write;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(content.as_bytes()))
    } else {
        fs::write(&path, content)
    };
    host_result(result.map(|_| Value::Null).map_err(|e| e.to_string()))
}

fn exists(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "fs.exists")?;
    let path = str_arg(args, 0, "path")?;
    Ok(Value::Bool(std::path::Path::new(&path).exists()))
}

fn list_dir(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "fs.listDir")?;
    let path = str_arg(args, 0, "path")?;
    let listing = fs::read_dir(&path)
        .map_err(|e| e.to_string())
        .and_then(|entries| {
            let mut names = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| e.to_string())?;
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            Ok(names)
        });
    host_result(listing.map(|names| {
        Value::Array(Rc::new(names.into_iter().map(Value::Str).collect()))
    }))
}

fn make_dir(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "fs.makeDir")?;
    let path = str_arg(args, 0, "path")?;
    host_result(
        fs::create_dir_all(&path)
            .map(|_| Value::Null)
            .map_err(|e| e.to_string()),
    )
}

fn remove(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "fs.remove")?;
    let path = str_arg(args, 0, "path")?;
    let p = std::path::Path::new(&path);
    let result = if p.is_dir() {
        fs::remove_dir_all(p)
    } else {
        fs::remove_file(p)
    };
    host_result(result.map(|_| Value::Null).map_err(|e| e.to_string()))
}
