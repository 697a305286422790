/// `json` — encode and decode JSON.
///
/// A hand-rolled recursive-descent parser mapping objects to hashes with
/// String keys, arrays to arrays, and null to Null. Numbers without a
/// fraction or exponent decode as Integer, everything else as Double.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{repr, Env, RuntimeError, Value};

use super::{arity, define_fn, result_of, str_arg};

pub fn register(types: &TypeEnv, values: &Env, prelude: &Prelude) {
    define_fn(
        types,
        values,
        "json.parse",
        vec![Type::Str],
        result_of(prelude, Type::Any),
    );
    define_fn(types, values, "json.stringify", vec![Type::Any], Type::Str);
    define_fn(types, values, "json.pretty", vec![Type::Any], Type::Str);
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    match name {
        "json.parse" => Some(parse(args)),
        "json.stringify" => Some(stringify(args, false)),
        "json.pretty" => Some(stringify(args, true)),
        _ => None,
    }
}

fn parse(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "json.parse")?;
    let text = str_arg(args, 0, "text")?;
    let mut parser = JsonParser {
        chars: text.chars().collect(),
        pos: 0,
    };
    Ok(match parser.parse() {
        Ok(v) => Value::ok(v),
        Err(e) => Value::err(Value::Str(e)),
    })
}

fn stringify(args: &[Value], pretty: bool) -> Result<Value, RuntimeError> {
    arity(args, 1, if pretty { "json.pretty" } else { "json.stringify" })?;
    let mut out = String::new();
    write_value(&mut out, &args[0], if pretty { Some(0) } else { None })?;
    Ok(Value::Str(out))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn write_value(out: &mut String, value: &Value, indent: Option<usize>) -> Result<(), RuntimeError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Value::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(RuntimeError::msg("cannot serialize a non-finite Double"));
            }
            let _ = write!(out, "{}", d);
        }
        Value::Str(s) => write_string(out, s),
        Value::Array(items) => write_seq(out, items.iter(), indent, |out, item, ind| {
            write_value(out, item, ind)
        })?,
        Value::Tuple(items) => write_seq(out, items.iter(), indent, |out, item, ind| {
            write_value(out, item, ind)
        })?,
        Value::Hash(entries) => {
            let entries = entries.borrow();
            write_obj(
                out,
                entries.values().map(|(k, v)| (key_string(k), v)),
                indent,
            )?;
        }
        Value::Record { fields, .. } => {
            let fields = fields.borrow();
            write_obj(
                out,
                fields.iter().map(|(k, v)| (k.clone(), v)),
                indent,
            )?;
        }
        other => {
            return Err(RuntimeError::msg(format!(
                "cannot serialize {} to JSON",
                other.type_name()
            )))
        }
    }
    Ok(())
}

fn key_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        other => repr(other),
    }
}

fn write_seq<'v, I>(
    out: &mut String,
    items: I,
    indent: Option<usize>,
    mut write_item: impl FnMut(&mut String, &'v Value, Option<usize>) -> Result<(), RuntimeError>,
) -> Result<(), RuntimeError>
where
    I: Iterator<Item = &'v Value>,
{
    out.push('[');
    let inner = indent.map(|i| i + 1);
    let mut first = true;
    for item in items {
        if !first {
            out.push(',');
        }
        first = false;
        newline_indent(out, inner);
        write_item(out, item, inner)?;
    }
    if !first {
        newline_indent(out, indent);
    }
    out.push(']');
    Ok(())
}

fn write_obj<'v, I>(out: &mut String, entries: I, indent: Option<usize>) -> Result<(), RuntimeError>
where
    I: Iterator<Item = (String, &'v Value)>,
{
    out.push('{');
    let inner = indent.map(|i| i + 1);
    let mut first = true;
    for (key, value) in entries {
        if !first {
            out.push(',');
        }
        first = false;
        newline_indent(out, inner);
        write_string(out, &key);
        out.push(':');
        if indent.is_some() {
            out.push(' ');
        }
        write_value(out, value, inner)?;
    }
    if !first {
        newline_indent(out, indent);
    }
    out.push('}');
    Ok(())
}

fn newline_indent(out: &mut String, indent: Option<usize>) {
    if let Some(depth) = indent {
        out.push('\n');
        out.push_str(&"  ".repeat(depth));
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct JsonParser {
    chars: Vec<char>,
    pos: usize,
}

impl JsonParser {
    fn parse(&mut self) -> Result<Value, String> {
        let value = self.parse_value()?;
        self.skip_ws();
        if self.pos != self.chars.len() {
            return Err(format!("trailing input at offset {}", self.pos));
        }
        Ok(value)
    }

    fn skip_ws(&mut self) {
        while matches!(self.current(), Some(' ' | '\t' | '\n' | '\r')) {
            self.pos += 1;
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.current() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", c, self.pos))
        }
    }

    fn parse_value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.current() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') => Ok(Value::Str(self.parse_string()?)),
            Some('t') => self.parse_word("true", Value::Bool(true)),
            Some('f') => self.parse_word("false", Value::Bool(false)),
            Some('n') => self.parse_word("null", Value::Null),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) => Err(format!("unexpected '{}' at offset {}", c, self.pos)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn parse_word(&mut self, word: &str, value: Value) -> Result<Value, String> {
        for expected in word.chars() {
            if self.current() != Some(expected) {
                return Err(format!("invalid literal at offset {}", self.pos));
            }
            self.pos += 1;
        }
        Ok(value)
    }

    fn parse_object(&mut self) -> Result<Value, String> {
        self.expect('{')?;
        let mut entries = BTreeMap::new();
        self.skip_ws();
        if self.current() == Some('}') {
            self.pos += 1;
            return Ok(Value::Hash(Rc::new(RefCell::new(entries))));
        }
        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(':')?;
            let value = self.parse_value()?;
            entries.insert(format!("String_{}", key), (Value::Str(key), value));
            self.skip_ws();
            match self.current() {
                Some(',') => {
                    self.pos += 1;
                }
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Hash(Rc::new(RefCell::new(entries))));
                }
                _ => return Err(format!("expected ',' or '}}' at offset {}", self.pos)),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, String> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.current() == Some(']') {
            self.pos += 1;
            return Ok(Value::Array(Rc::new(items)));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.current() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(Rc::new(items)));
                }
                _ => return Err(format!("expected ',' or ']' at offset {}", self.pos)),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.current() {
                None => return Err("unterminated string".to_string()),
                Some('"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.current() {
                        Some('"') => out.push('"'),
                        Some('\\') => out.push('\\'),
                        Some('/') => out.push('/'),
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('b') => out.push('\u{8}'),
                        Some('f') => out.push('\u{c}'),
                        Some('u') => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                self.pos += 1;
                                let digit = self
                                    .current()
                                    .and_then(|c| c.to_digit(16))
                                    .ok_or_else(|| "invalid \\u escape".to_string())?;
                                code = code * 16 + digit;
                            }
                            out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        _ => return Err("invalid escape".to_string()),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if self.current() == Some('-') {
            self.pos += 1;
        }
        let mut is_double = false;
        while let Some(c) = self.current() {
            match c {
                '0'..='9' => self.pos += 1,
                '.' | 'e' | 'E' | '+' | '-' => {
                    is_double = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_double {
            text.parse::<f64>()
                .map(Value::Double)
                .map_err(|_| format!("invalid number '{}'", text))
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("invalid number '{}'", text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_text(s: &str) -> Value {
        match parse(&[Value::Str(s.to_string())]).unwrap() {
            Value::Sum { variant, payload, .. } if variant == "Ok" => payload[0].clone(),
            other => panic!("parse failed: {:?}", other),
        }
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parse_text("42"), Value::Int(42));
        assert_eq!(parse_text("-1.5"), Value::Double(-1.5));
        assert_eq!(parse_text("true"), Value::Bool(true));
        assert_eq!(parse_text("null"), Value::Null);
        assert_eq!(parse_text("\"a\\nb\""), Value::Str("a\nb".to_string()));
    }

    #[test]
    fn round_trips_nested_structures() {
        let parsed = parse_text(r#"{"a": [1, 2], "b": {"c": true}}"#);
        let text = match stringify(&[parsed], false).unwrap() {
            Value::Str(s) => s,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(text, r#"{"a":[1,2],"b":{"c":true}}"#);
    }

    #[test]
    fn malformed_input_is_err() {
        let result = parse(&[Value::Str("{bad".to_string())]).unwrap();
        assert!(matches!(
            result,
            Value::Sum { variant, .. } if variant == "Err"
        ));
    }
}
