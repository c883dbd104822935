//! Assertion builtin used by the test-running workflow (§4.9/§6.1).

use crate::errors::{ErrorKind, JayError, JayResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "assert" => Some(assert_impl(interp, args)),
        _ => None,
    }
}

fn assert_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let cond = args.first().map(Value::is_truthy).unwrap_or(false);
    if cond {
        return Ok(Value::Bool(true));
    }
    let message = args.get(1).map(Value::to_display_string);
    Err(JayError::new(interp.current_file.clone(), 0, ErrorKind::AssertionFailed(message)))
}
