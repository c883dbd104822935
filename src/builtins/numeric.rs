//! Numeric and conversion builtins (§6.2).

use rand::Rng;

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    let n0 = || args.first().map(Value::to_number).unwrap_or(0.0);
    match name {
        "abs" => Some(Ok(num_result(n0().abs(), args.first()))),
        "floor" => Some(Ok(Value::Int(n0().floor() as i64))),
        "ceil" => Some(Ok(Value::Int(n0().ceil() as i64))),
        "round" => Some(Ok(Value::Int(n0().round() as i64))),
        "sqrt" => Some(Ok(Value::Float(n0().sqrt()))),
        "pow" => Some(Ok(Value::Float(n0().powf(args.get(1).map(Value::to_number).unwrap_or(0.0))))),
        "min" => Some(Ok(fold(args, f64::min))),
        "max" => Some(Ok(fold(args, f64::max))),
        "int" | "toInt" | "parseInt" => Some(Ok(Value::Int(n0() as i64))),
        "float" | "toFloat" | "parseFloat" => Some(Ok(Value::Float(n0()))),
        "toString" => Some(Ok(Value::str(args.first().map(Value::to_display_string).unwrap_or_default()))),
        "random" => Some(Ok(Value::Float(rand::thread_rng().gen::<f64>()))),
        "randomInt" => Some(Ok(random_int_impl(args))),
        "now" => Some(Ok(Value::Int(chrono::Utc::now().timestamp_millis()))),
        "time" => Some(Ok(Value::Int(chrono::Utc::now().timestamp()))),
        // The timer queue runs on a virtual clock rather than real wall-clock
        // sleeps (see timers.rs), so `sleep` schedules a callback-less delay
        // on that clock instead of blocking the process.
        "sleep" => Some(Ok(sleep_impl(interp, args))),
        _ => None,
    }
}

fn num_result(v: f64, hint: Option<&Value>) -> Value {
    match hint {
        Some(Value::Int(_)) => Value::Int(v as i64),
        _ => Value::Float(v),
    }
}

fn fold(args: &[Value], f: fn(f64, f64) -> f64) -> Value {
    let nums: Vec<f64> = match args.first() {
        Some(Value::Array(a)) => a.borrow().iter().map(Value::to_number).collect(),
        _ => args.iter().map(Value::to_number).collect(),
    };
    let all_int = match args.first() {
        Some(Value::Array(a)) => a.borrow().iter().all(|v| matches!(v, Value::Int(_))),
        _ => args.iter().all(|v| matches!(v, Value::Int(_))),
    };
    let result = nums.into_iter().fold(f64::NAN, |acc, x| if acc.is_nan() { x } else { f(acc, x) });
    if all_int && result.is_finite() {
        Value::Int(result as i64)
    } else {
        Value::Float(result)
    }
}

fn sleep_impl(interp: &mut Interpreter, args: &[Value]) -> Value {
    let ms = args.first().map(Value::to_number).unwrap_or(0.0).max(0.0) as u64;
    interp.timers.advance(ms);
    Value::Null
}

fn random_int_impl(args: &[Value]) -> Value {
    let lo = args.first().map(Value::to_number).unwrap_or(0.0) as i64;
    let hi = args.get(1).map(Value::to_number).unwrap_or(lo as f64) as i64;
    if hi <= lo {
        return Value::Int(lo);
    }
    Value::Int(rand::thread_rng().gen_range(lo..=hi))
}
