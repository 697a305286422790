/// `datetime` — epoch clock readings and civil-date splits.
///
/// `now`/`nowMillis` are nondeterministic by nature. The civil-date math is
/// the standard days-from-epoch algorithm, so no calendar dependency is
/// needed.
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::checker::Prelude;
use crate::types::env::TypeEnv;
use crate::types::Type;
use crate::value::{Env, RuntimeError, Value};

use super::{arity, define_fn, int_arg};

pub fn register(types: &TypeEnv, values: &Env, _prelude: &Prelude) {
    define_fn(types, values, "datetime.now", vec![], Type::Integer);
    define_fn(types, values, "datetime.nowMillis", vec![], Type::Integer);
    define_fn(types, values, "datetime.year", vec![Type::Integer], Type::Integer);
    define_fn(types, values, "datetime.month", vec![Type::Integer], Type::Integer);
    define_fn(types, values, "datetime.day", vec![Type::Integer], Type::Integer);
    define_fn(types, values, "datetime.iso", vec![Type::Integer], Type::Str);
}

pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, RuntimeError>> {
    let result = match name {
        "datetime.now" => now(args, false),
        "datetime.nowMillis" => now(args, true),
        "datetime.year" => civil_part(args, "datetime.year", |(y, _, _)| y),
        "datetime.month" => civil_part(args, "datetime.month", |(_, m, _)| m),
        "datetime.day" => civil_part(args, "datetime.day", |(_, _, d)| d),
        "datetime.iso" => iso(args),
        _ => return None,
    };
    Some(result)
}

fn now(args: &[Value], millis: bool) -> Result<Value, RuntimeError> {
    arity(args, 0, if millis { "datetime.nowMillis" } else { "datetime.now" })?;
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| RuntimeError::msg(format!("clock error: {}", e)))?;
    Ok(Value::Int(if millis {
        elapsed.as_millis() as i64
    } else {
        elapsed.as_secs() as i64
    }))
}

/// Civil date from days since the Unix epoch (Howard Hinnant's algorithm).
fn civil_from_epoch_secs(secs: i64) -> (i64, i64, i64) {
    let days = secs.div_euclid(86_400);
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn civil_part(
    args: &[Value],
    name: &str,
    pick: fn((i64, i64, i64)) -> i64,
) -> Result<Value, RuntimeError> {
    arity(args, 1, name)?;
    let secs = int_arg(args, 0, "epochSeconds")?;
    Ok(Value::Int(pick(civil_from_epoch_secs(secs))))
}

fn iso(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1, "datetime.iso")?;
    let secs = int_arg(args, 0, "epochSeconds")?;
    let (y, m, d) = civil_from_epoch_secs(secs);
    Ok(Value::Str(format!("{:04}-{:02}-{:02}", y, m, d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_epoch_secs(0), (1970, 1, 1));
        assert_eq!(civil_from_epoch_secs(86_400), (1970, 1, 2));
        // 2000-03-01, the day after a century leap day.
        assert_eq!(civil_from_epoch_secs(951_868_800), (2000, 3, 1));
    }

    #[test]
    fn iso_formatting() {
        let v = iso(&[Value::Int(0)]).unwrap();
        assert_eq!(v, Value::Str("1970-01-01".to_string()));
    }
}
