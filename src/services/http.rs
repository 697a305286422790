/// `net.http` — HTTP client built on `ureq`.
///
/// Any completed HTTP exchange (including 4xx/5xx) is `Ok(Response)`;
/// transport failures are `Err(String)`. Response bodies are capped at
/// 10 MB.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::{RecordType, Type};
use crate::value::{Env, RuntimeError, Value};

use super::{arity, define_fn, result_of, str_arg};

const BODY_LIMIT: u64 = 10 * 1024 * 1024;

pub fn register(types: &TypeEnv, values: &Env, prelude: &Prelude) {
    let response_decl = Rc::new(RecordType {
        name: "Response".to_string(),
        type_params: vec![],
        fields: RefCell::new(vec![
            ("status".to_string(), Type::Integer),
            ("body".to_string(), Type::Str),
            (
                "headers".to_string(),
                Type::Hash(Box::new(Type::Str), Box::new(Type::Str)),
            ),
        ]),
    });
    let response = Type::Record {
        decl: response_decl,
        type_args: vec![],
    };
    types.define_type("Response", response.clone());

    let ret = || result_of(prelude, response.clone());
    define_fn(types, values, "net.http.get", vec![Type::Str], ret());
    define_fn(types, values, "net.http.delete", vec![Type::Str], ret());
    define_fn(
        types,
        values,
        "net.http.post",
        vec![Type::Str, Type::Str, Type::Str],
        ret(),
    );
    define_fn(
        types,
        values,
        "net.http.put",
        vec![Type::Str, Type::Str, Type::Str],
        ret(),
    );
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    match name {
        "net.http.get" | "net.http.delete" => Some(simple(name, args)),
        "net.http.post" | "net.http.put" => Some(with_body(name, args)),
        _ => None,
    }
}

fn method_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or("get").to_uppercase()
}

fn simple(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, name)?;
    let url = str_arg(args, 0, "url")?;
    let result = ureq::request(&method_of(name), &url)
        .timeout(Duration::from_secs(10))
        .call();
    response_value(result)
}

fn with_body(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 3, name)?;
    let url = str_arg(args, 0, "url")?;
    let body = str_arg(args, 1, "body")?;
    let content_type = str_arg(args, 2, "contentType")?;
    let result = ureq::request(&method_of(name), &url)
        .timeout(Duration::from_secs(10))
        .set("Content-Type", &content_type)
        .send_string(&body);
    response_value(result)
}

fn response_value(result: Result<ureq::Response, ureq::Error>) -> Result<Value, RuntimeError> {
    match result {
        Ok(resp) => build_response(resp),
        Err(ureq::Error::Status(_, resp)) => build_response(resp),
        Err(ureq::Error::Transport(e)) => Ok(Value::err(Value::Str(e.to_string()))),
    }
}

fn build_response(resp: ureq::Response) -> Result<Value, RuntimeError> {
    use std::io::Read;

    let status = resp.status() as i64;
    let mut headers = BTreeMap::new();
    for header in resp.headers_names() {
        let value = resp.header(&header).unwrap_or("").to_string();
        headers.insert(
            format!("String_{}", header),
            (Value::Str(header.clone()), Value::Str(value)),
        );
    }

    let mut buf = Vec::new();
    let read = resp
        .into_reader()
        .take(BODY_LIMIT + 1)
        .read_to_end(&mut buf)
        .map_err(|e| RuntimeError::msg(format!("failed to read response body: {}", e)))?;
    if read as u64 > BODY_LIMIT {
        return Ok(Value::err(Value::Str(
            "response body exceeds 10 MB limit".to_string(),
        )));
    }
    let body = String::from_utf8_lossy(&buf).into_owned();

    Ok(Value::ok(Value::Record {
        type_name: "Response".to_string(),
        fields: Rc::new(RefCell::new(vec![
            ("status".to_string(), Value::Int(status)),
            ("body".to_string(), Value::Str(body)),
            (
                "headers".to_string(),
                Value::Hash(Rc::new(RefCell::new(headers))),
            ),
        ])),
    }))
}
