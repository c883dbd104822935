//! JSON round-tripping builtins (§6.2 / §8).

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::errors::{ErrorKind, JayError, JayResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "jsonParse" => Some(json_parse_impl(interp, args)),
        "jsonStringify" => Some(Ok(json_stringify_impl(args))),
        _ => None,
    }
}

fn json_parse_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let text = args.first().map(Value::to_display_string).unwrap_or_default();
    let parsed: Json = serde_json::from_str(&text)
        .map_err(|e| JayError::new(interp.current_file.clone(), 0, ErrorKind::Other(format!("invalid JSON: {e}"))))?;
    Ok(json_to_value(&parsed))
}

fn json_stringify_impl(args: &[Value]) -> Value {
    let v = args.first().cloned().unwrap_or(Value::Null);
    Value::str(serde_json::to_string(&value_to_json(&v)).unwrap_or_else(|_| "null".to_string()))
}

fn json_to_value(j: &Json) -> Value {
    match j {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::str(s.clone()),
        Json::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        Json::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_value(v));
            }
            Value::object(out)
        }
    }
}

fn value_to_json(v: &Value) -> Json {
    match v {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Str(s) => Json::String(s.as_str().to_string()),
        Value::Array(a) => Json::Array(a.borrow().iter().map(value_to_json).collect()),
        Value::Object(o) | Value::Module(o) => {
            let mut map = serde_json::Map::new();
            for (k, v) in o.borrow().iter() {
                map.insert(k.clone(), value_to_json(v));
            }
            Json::Object(map)
        }
        Value::Instance(inst) => {
            let mut map = serde_json::Map::new();
            for (k, v) in inst.props.borrow().iter() {
                map.insert(k.clone(), value_to_json(v));
            }
            Json::Object(map)
        }
        Value::FunctionRef(_) | Value::ClassRef(_) | Value::Closure(_) => Json::Null,
    }
}
