/// `math` — numeric helpers and constants.
///
/// `random` is one of the two documented nondeterministic builtins (the
/// other is `datetime.now`); it draws from a xorshift state seeded from the
/// system clock.
use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{Env, RuntimeError, Value};

use super::{arity, define_fn, double_arg};

pub fn register(types: &TypeEnv, values: &Env, _prelude: &Prelude) {
    types.define("pi", Type::Double, false);
    values.define("pi", Value::Double(std::f64::consts::PI), false);
    types.define("e", Type::Double, false);
    values.define("e", Value::Double(std::f64::consts::E), false);

    let d = || Type::Double;
    define_fn(types, values, "math.abs", vec![d()], d());
    define_fn(types, values, "math.sqrt", vec![d()], d());
    define_fn(types, values, "math.pow", vec![d(), d()], d());
    define_fn(types, values, "math.floor", vec![d()], Type::Integer);
    define_fn(types, values, "math.ceil", vec![d()], Type::Integer);
    define_fn(types, values, "math.round", vec![d()], Type::Integer);
    define_fn(types, values, "math.min", vec![d(), d()], d());
    define_fn(types, values, "math.max", vec![d(), d()], d());
    define_fn(types, values, "math.clamp", vec![d(), d(), d()], d());
    define_fn(types, values, "math.random", vec![], d());
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    let result = match name {
        "math.abs" => unary(name, args, f64::abs),
        "math.sqrt" => unary(name, args, f64::sqrt),
        "math.pow" => binary(name, args, f64::powf),
        "math.floor" => to_int(name, args, f64::floor),
        "math.ceil" => to_int(name, args, f64::ceil),
        "math.round" => to_int(name, args, f64::round),
        "math.min" => binary(name, args, f64::min),
        "math.max" => binary(name, args, f64::max),
        "math.clamp" => clamp(args),
        "math.random" => random(args),
        _ => return None,
    };
    Some(result)
}

fn unary(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, RuntimeError> {
    arity(args, 1, name)?;
    Ok(Value::Double(f(double_arg(args, 0, "value")?)))
}

fn binary(name: &str, args: &[Value], f: fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    arity(args, 2, name)?;
    Ok(Value::Double(f(
        double_arg(args, 0, "left")?,
        double_arg(args, 1, "right")?,
    )))
}

fn to_int(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, RuntimeError> {
    arity(args, 1, name)?;
    Ok(Value::Int(f(double_arg(args, 0, "value")?) as i64))
}

fn clamp(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 3, "math.clamp")?;
    let value = double_arg(args, 0, "value")?;
    let low = double_arg(args, 1, "low")?;
    let high = double_arg(args, 2, "high")?;
    Ok(Value::Double(value.max(low).min(high)))
}

thread_local! {
    static RNG_STATE: Cell<u64> = Cell::new(0);
}

fn random(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 0, "math.random")?;
    let next = RNG_STATE.with(|state| {
        let mut x = state.get();
        if x == 0 {
            x = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x9e3779b97f4a7c15)
                | 1;
        }
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        x
    });
    Ok(Value::Double((next >> 11) as f64 / (1u64 << 53) as f64))
}
