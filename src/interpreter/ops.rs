/// Arithmetic, comparison, and prefix operators on runtime values.
///
/// Mixed Integer/Double arithmetic widens to Double, mirroring the type
/// checker. Division and modulo by zero are runtime errors.
use crate::lexer::Token;
use crate::value::{RuntimeError, Value};

pub(crate) fn prefix(op: &str, value: Value, token: &Token) -> Result<Value, RuntimeError> {
    match (op, &value) {
        ("-", Value::Int(i)) => Ok(Value::Int(-i)),
        ("-", Value::Double(d)) => Ok(Value::Double(-d)),
        ("!", v) => Ok(Value::Bool(!v.is_truthy())),
        (op, v) => Err(RuntimeError::at(
            format!("prefix '{}' cannot be applied to {}", op, v.type_name()),
            token,
        )),
    }
}

pub(crate) fn binary(
    op: &str,
    left: Value,
    right: Value,
    token: &Token,
) -> Result<Value, RuntimeError> {
    match op {
        "+" | "-" | "*" | "/" => arithmetic(op, left, right, token),
        "%" => modulo(left, right, token),
        "==" => Ok(Value::Bool(left == right)),
        "!=" => Ok(Value::Bool(left != right)),
        "<" | ">" | "<=" | ">=" => compare(op, left, right, token),
        other => Err(RuntimeError::at(
            format!("unknown operator '{}'", other),
            token,
        )),
    }
}

fn arithmetic(op: &str, left: Value, right: Value, token: &Token) -> Result<Value, RuntimeError> {
    if op == "+" {
        if let (Value::Str(a), Value::Str(b)) = (&left, &right) {
            return Ok(Value::Str(format!("{}{}", a, b)));
        }
    }
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => match op {
            "+" => Ok(Value::Int(a + b)),
            "-" => Ok(Value::Int(a - b)),
            "*" => Ok(Value::Int(a * b)),
            "/" => {
                if *b == 0 {
                    Err(RuntimeError::at("division by zero", token))
                } else {
                    Ok(Value::Int(a / b))
                }
            }
            _ => unreachable!(),
        },
        (Value::Int(_), Value::Double(_))
        | (Value::Double(_), Value::Int(_))
        | (Value::Double(_), Value::Double(_)) => {
            let a = as_double(&left);
            let b = as_double(&right);
            match op {
                "+" => Ok(Value::Double(a + b)),
                "-" => Ok(Value::Double(a - b)),
                "*" => Ok(Value::Double(a * b)),
                "/" => {
                    if b == 0.0 {
                        Err(RuntimeError::at("division by zero", token))
                    } else {
                        Ok(Value::Double(a / b))
                    }
                }
                _ => unreachable!(),
            }
        }
        (l, r) => Err(RuntimeError::at(
            format!(
                "operator '{}' cannot combine {} and {}",
                op,
                l.type_name(),
                r.type_name()
            ),
            token,
        )),
    }
}

fn modulo(left: Value, right: Value, token: &Token) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                Err(RuntimeError::at("modulo by zero", token))
            } else {
                Ok(Value::Int(a % b))
            }
        }
        (l, r) => Err(RuntimeError::at(
            format!(
                "operator '%' expects Integer operands, found {} and {}",
                l.type_name(),
                r.type_name()
            ),
            token,
        )),
    }
}

fn compare(op: &str, left: Value, right: Value, token: &Token) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(match op {
            "<" => a < b,
            ">" => a > b,
            "<=" => a <= b,
            ">=" => a >= b,
            _ => unreachable!(),
        })),
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
            let a = as_double(&left);
            let b = as_double(&right);
            Ok(Value::Bool(match op {
                "<" => a < b,
                ">" => a > b,
                "<=" => a <= b,
                ">=" => a >= b,
                _ => unreachable!(),
            }))
        }
        (l, r) => Err(RuntimeError::at(
            format!(
                "operator '{}' cannot order {} and {}",
                op,
                l.type_name(),
                r.type_name()
            ),
            token,
        )),
    }
}

fn as_double(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Double(d) => *d,
        _ => f64::NAN,
    }
}
