//! String builtins (§6.2). Each also doubles as a method when the value
//! is indexed via `str.method(...)` syntax (the interpreter prepends the
//! receiver as the first argument).

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(_interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "upper" | "toUpperCase" => Some(Ok(Value::str(str_arg(args, 0).to_uppercase()))),
        "lower" | "toLowerCase" => Some(Ok(Value::str(str_arg(args, 0).to_lowercase()))),
        "trim" => Some(Ok(Value::str(str_arg(args, 0).trim().to_string()))),
        "split" => Some(Ok(split_impl(args))),
        "join" => Some(Ok(join_impl(args))),
        "replace" | "replaceAll" => Some(Ok(Value::str(str_arg(args, 0).replace(&str_arg(args, 1), &str_arg(args, 2))))),
        "indexOf" => Some(Ok(index_of_impl(args))),
        "includes" => Some(Ok(includes_impl(args))),
        "startsWith" => Some(Ok(Value::Bool(str_arg(args, 0).starts_with(&str_arg(args, 1))))),
        "endsWith" => Some(Ok(Value::Bool(str_arg(args, 0).ends_with(&str_arg(args, 1))))),
        "repeat" => Some(Ok(Value::str(str_arg(args, 0).repeat(num_arg(args, 1).max(0.0) as usize)))),
        "charAt" => Some(Ok(char_at_impl(args))),
        _ => None,
    }
}

fn str_arg(args: &[Value], i: usize) -> String {
    args.get(i).map(Value::to_display_string).unwrap_or_default()
}

fn num_arg(args: &[Value], i: usize) -> f64 {
    args.get(i).map(Value::to_number).unwrap_or(0.0)
}

fn split_impl(args: &[Value]) -> Value {
    let s = str_arg(args, 0);
    let sep = str_arg(args, 1);
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::str(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(Value::str).collect()
    };
    Value::array(parts)
}

fn join_impl(args: &[Value]) -> Value {
    let sep = str_arg(args, 1);
    let items = match args.first() {
        Some(Value::Array(a)) => a.borrow().iter().map(Value::to_display_string).collect::<Vec<_>>(),
        _ => vec![],
    };
    Value::str(items.join(&sep))
}

fn index_of_impl(args: &[Value]) -> Value {
    if let Some(Value::Array(a)) = args.first() {
        let needle = args.get(1).cloned().unwrap_or(Value::Null);
        return Value::Int(a.borrow().iter().position(|v| v.loose_eq(&needle)).map(|i| i as i64).unwrap_or(-1));
    }
    let s = str_arg(args, 0);
    let needle = str_arg(args, 1);
    match s.find(needle.as_str()) {
        Some(byte_idx) => Value::Int(s[..byte_idx].chars().count() as i64),
        None => Value::Int(-1),
    }
}

fn includes_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Array(a)) => {
            let needle = args.get(1).cloned().unwrap_or(Value::Null);
            Value::Bool(a.borrow().iter().any(|v| v.loose_eq(&needle)))
        }
        _ => Value::Bool(str_arg(args, 0).contains(str_arg(args, 1).as_str())),
    }
}

fn char_at_impl(args: &[Value]) -> Value {
    let s = str_arg(args, 0);
    let i = num_arg(args, 1) as i64;
    if i < 0 {
        return Value::str(String::new());
    }
    match s.chars().nth(i as usize) {
        Some(c) => Value::str(c.to_string()),
        None => Value::str(String::new()),
    }
}
