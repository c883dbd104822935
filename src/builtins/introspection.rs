//! Type-introspection builtins (§6.2).

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(_interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "typeof" => Some(Ok(Value::str(args.first().map(Value::type_name).unwrap_or("null")))),
        "isArray" => Some(Ok(Value::Bool(matches!(args.first(), Some(Value::Array(_)))))),
        "isObject" => Some(Ok(Value::Bool(matches!(args.first(), Some(Value::Object(_)) | Some(Value::Module(_)))))),
        "isString" => Some(Ok(Value::Bool(matches!(args.first(), Some(Value::Str(_)))))),
        "isNumber" => Some(Ok(Value::Bool(matches!(args.first(), Some(Value::Int(_)) | Some(Value::Float(_)))))),
        "isFunc" | "isFunction" => Some(Ok(Value::Bool(matches!(
            args.first(),
            Some(Value::Closure(_)) | Some(Value::FunctionRef(_))
        )))),
        _ => None,
    }
}
