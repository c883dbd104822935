//! `setTimeout`/`setInterval`/`clearTimer` builtins (§3.6, §4.8).

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::timers::ScheduledTimer;
use crate::value::Value;

pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "setTimeout" => Some(Ok(schedule(interp, args, false))),
        "setInterval" => Some(Ok(schedule(interp, args, true))),
        "clearTimer" | "clearTimeout" | "clearInterval" => Some(Ok(clear(interp, args))),
        _ => None,
    }
}

fn schedule(interp: &mut Interpreter, args: &[Value], repeating: bool) -> Value {
    let callback = args.first().cloned().unwrap_or(Value::Null);
    let delay_ms = args.get(1).map(Value::to_number).unwrap_or(0.0).max(0.0) as u64;
    let id = interp.timers.schedule(ScheduledTimer::new(callback, interp.global.clone(), delay_ms, repeating));
    Value::Int(id as i64)
}

fn clear(interp: &mut Interpreter, args: &[Value]) -> Value {
    let id = args.first().map(Value::to_number).unwrap_or(-1.0) as i64;
    Value::Bool(interp.timers.cancel(id as u64))
}
