//! Array/object builtins (§6.2).

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "len" | "length" => Some(Ok(len_impl(args))),
        "push" => Some(Ok(push_impl(args))),
        "pop" => Some(Ok(pop_impl(args))),
        "shift" => Some(Ok(shift_impl(args))),
        "unshift" => Some(Ok(unshift_impl(args))),
        "slice" => Some(Ok(slice_impl(args))),
        "keys" => Some(Ok(keys_impl(args))),
        "values" => Some(Ok(values_impl(args))),
        "has" | "hasKey" => Some(Ok(has_impl(args))),
        "delete" => Some(Ok(delete_impl(args))),
        "reverse" => Some(Ok(reverse_impl(args))),
        "concat" => Some(Ok(concat_impl(args))),
        "range" => Some(Ok(range_impl(args))),
        "sort" => Some(sort_impl(interp, args)),
        "map" => Some(map_impl(interp, args)),
        "filter" => Some(filter_impl(interp, args)),
        "reduce" => Some(reduce_impl(interp, args)),
        "forEach" => Some(for_each_impl(interp, args)),
        "find" => Some(find_impl(interp, args)),
        "findIndex" => Some(find_index_impl(interp, args)),
        "every" => Some(every_impl(interp, args)),
        "some" => Some(some_impl(interp, args)),
        "clone" => Some(Ok(clone_impl(args.first().unwrap_or(&Value::Null)))),
        "str" => Some(Ok(Value::str(args.first().map(Value::to_display_string).unwrap_or_default()))),
        _ => None,
    }
}

fn len_impl(args: &[Value]) -> Value {
    Value::Int(match args.first() {
        Some(Value::Array(a)) => a.borrow().len() as i64,
        Some(Value::Str(s)) => s.chars().count() as i64,
        Some(Value::Object(o)) | Some(Value::Module(o)) => o.borrow().len() as i64,
        _ => 0,
    })
}

fn push_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Array(a)) => {
            for v in &args[1..] {
                a.borrow_mut().push(v.clone());
            }
            Value::Int(a.borrow().len() as i64)
        }
        _ => Value::Null,
    }
}

fn pop_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Array(a)) => a.borrow_mut().pop().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn shift_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Array(a)) => {
            let mut b = a.borrow_mut();
            if b.is_empty() {
                Value::Null
            } else {
                b.remove(0)
            }
        }
        _ => Value::Null,
    }
}

fn unshift_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Array(a)) => {
            for (offset, v) in args[1..].iter().enumerate() {
                a.borrow_mut().insert(offset, v.clone());
            }
            Value::Int(a.borrow().len() as i64)
        }
        _ => Value::Null,
    }
}

fn slice_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Array(a)) => {
            let b = a.borrow();
            let (start, end) = slice_bounds(b.len(), args);
            Value::array(b[start..end].to_vec())
        }
        Some(Value::Str(s)) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), args);
            Value::str(chars[start..end].iter().collect::<String>())
        }
        _ => Value::Null,
    }
}

fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let norm = |i: i64| -> usize {
        if i < 0 {
            len.saturating_sub((-i) as usize)
        } else {
            (i as usize).min(len)
        }
    };
    let start = args.get(1).map(|v| norm(v.to_number() as i64)).unwrap_or(0);
    let end = args.get(2).map(|v| norm(v.to_number() as i64)).unwrap_or(len);
    if start >= end {
        (0, 0)
    } else {
        (start, end)
    }
}

fn keys_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Object(o)) | Some(Value::Module(o)) => {
            Value::array(o.borrow().keys().map(|k| Value::str(k.clone())).collect())
        }
        _ => Value::array(vec![]),
    }
}

fn values_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Object(o)) | Some(Value::Module(o)) => Value::array(o.borrow().values().cloned().collect()),
        _ => Value::array(vec![]),
    }
}

fn has_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Object(o)) | Some(Value::Module(o)) => {
            let key = args.get(1).map(Value::to_display_string).unwrap_or_default();
            Value::Bool(o.borrow().contains_key(&key))
        }
        Some(Value::Array(a)) => {
            let needle = args.get(1).cloned().unwrap_or(Value::Null);
            Value::Bool(a.borrow().iter().any(|v| v.loose_eq(&needle)))
        }
        _ => Value::Bool(false),
    }
}

fn delete_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Object(o)) | Some(Value::Module(o)) => {
            let key = args.get(1).map(Value::to_display_string).unwrap_or_default();
            Value::Bool(o.borrow_mut().shift_remove(&key).is_some())
        }
        _ => Value::Bool(false),
    }
}

fn reverse_impl(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Array(a)) => {
            let mut items = a.borrow().clone();
            items.reverse();
            Value::array(items)
        }
        Some(Value::Str(s)) => Value::str(s.chars().rev().collect::<String>()),
        _ => Value::Null,
    }
}

fn concat_impl(args: &[Value]) -> Value {
    let mut out = Vec::new();
    for a in args {
        match a {
            Value::Array(arr) => out.extend(arr.borrow().iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Value::array(out)
}

fn range_impl(args: &[Value]) -> Value {
    let (start, stop, step) = match args.len() {
        0 => (0.0, 0.0, 1.0),
        1 => (0.0, args[0].to_number(), 1.0),
        2 => (args[0].to_number(), args[1].to_number(), 1.0),
        _ => (args[0].to_number(), args[1].to_number(), args[2].to_number()),
    };
    let mut out = Vec::new();
    if step == 0.0 {
        return Value::array(out);
    }
    let mut i = start;
    if step > 0.0 {
        while i < stop {
            out.push(Value::Int(i as i64));
            i += step;
        }
    } else {
        while i > stop {
            out.push(Value::Int(i as i64));
            i += step;
        }
    }
    Value::array(out)
}

fn sort_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Null) };
    let mut items = a.borrow().clone();
    if let Some(cmp) = args.get(1) {
        let scope = interp.global.clone();
        let mut err = None;
        items.sort_by(|x, y| {
            if err.is_some() {
                return std::cmp::Ordering::Equal;
            }
            match interp.call_value(cmp, &[x.clone(), y.clone()], &scope, 0) {
                Ok(v) => v.to_number().partial_cmp(&0.0).unwrap_or(std::cmp::Ordering::Equal),
                Err(e) => {
                    err = Some(e);
                    std::cmp::Ordering::Equal
                }
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
    } else {
        items.sort_by(|x, y| {
            if let (Value::Str(a), Value::Str(b)) = (x, y) {
                a.as_str().cmp(b.as_str())
            } else {
                x.to_number().partial_cmp(&y.to_number()).unwrap_or(std::cmp::Ordering::Equal)
            }
        });
    }
    Ok(Value::array(items))
}

fn map_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Null) };
    let Some(f) = args.get(1) else { return Ok(Value::Null) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    let mut out = Vec::with_capacity(items.len());
    for (i, v) in items.into_iter().enumerate() {
        out.push(interp.call_value(f, &[v, Value::Int(i as i64)], &scope, 0)?);
    }
    Ok(Value::array(out))
}

fn filter_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Null) };
    let Some(f) = args.get(1) else { return Ok(Value::Null) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    let mut out = Vec::new();
    for (i, v) in items.into_iter().enumerate() {
        if interp.call_value(f, &[v.clone(), Value::Int(i as i64)], &scope, 0)?.is_truthy() {
            out.push(v);
        }
    }
    Ok(Value::array(out))
}

fn reduce_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Null) };
    let Some(f) = args.get(1) else { return Ok(Value::Null) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    let mut iter = items.into_iter();
    let mut acc = match args.get(2) {
        Some(init) => init.clone(),
        None => iter.next().unwrap_or(Value::Null),
    };
    for (i, v) in iter.enumerate() {
        acc = interp.call_value(f, &[acc, v, Value::Int(i as i64)], &scope, 0)?;
    }
    Ok(acc)
}

fn for_each_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Null) };
    let Some(f) = args.get(1) else { return Ok(Value::Null) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    for (i, v) in items.into_iter().enumerate() {
        interp.call_value(f, &[v, Value::Int(i as i64)], &scope, 0)?;
    }
    Ok(Value::Null)
}

fn find_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Null) };
    let Some(f) = args.get(1) else { return Ok(Value::Null) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    for (i, v) in items.into_iter().enumerate() {
        if interp.call_value(f, &[v.clone(), Value::Int(i as i64)], &scope, 0)?.is_truthy() {
            return Ok(v);
        }
    }
    Ok(Value::Null)
}

fn find_index_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Int(-1)) };
    let Some(f) = args.get(1) else { return Ok(Value::Int(-1)) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    for (i, v) in items.into_iter().enumerate() {
        if interp.call_value(f, &[v, Value::Int(i as i64)], &scope, 0)?.is_truthy() {
            return Ok(Value::Int(i as i64));
        }
    }
    Ok(Value::Int(-1))
}

fn every_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Bool(false)) };
    let Some(f) = args.get(1) else { return Ok(Value::Bool(false)) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    for (i, v) in items.into_iter().enumerate() {
        if !interp.call_value(f, &[v, Value::Int(i as i64)], &scope, 0)?.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn some_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let Some(Value::Array(a)) = args.first() else { return Ok(Value::Bool(false)) };
    let Some(f) = args.get(1) else { return Ok(Value::Bool(false)) };
    let scope = interp.global.clone();
    let items = a.borrow().clone();
    for (i, v) in items.into_iter().enumerate() {
        if interp.call_value(f, &[v, Value::Int(i as i64)], &scope, 0)?.is_truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

/// Deep value clone, matching `val_clone` in the original: scalars copy
/// trivially, arrays/objects recurse so the clone shares no `Rc` with the
/// source.
fn clone_impl(value: &Value) -> Value {
    match value {
        Value::Array(a) => Value::array(a.borrow().iter().map(clone_impl).collect()),
        Value::Object(o) => {
            Value::object(o.borrow().iter().map(|(k, v)| (k.clone(), clone_impl(v))).collect())
        }
        other => other.clone(),
    }
}
