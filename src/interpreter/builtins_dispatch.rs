//! Glue between node-level call dispatch and the built-in catalog in
//! `crate::builtins`. Builtins are tried in a fixed order, matching
//! `call_func`'s "check the builtins table first" precedence in the
//! original source.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::builtins;
use crate::errors::{ErrorKind, JayResult};
use crate::interpreter::Interpreter;
use crate::scope::ScopeRef;
use crate::value::Value;

lazy_static! {
    static ref BUILTIN_NAMES: HashSet<&'static str> = {
        [
            "print", "println", "input",
            "upper", "toUpperCase", "lower", "toLowerCase", "trim", "split", "join",
            "replace", "replaceAll", "indexOf", "includes", "startsWith", "endsWith",
            "repeat", "charAt",
            "abs", "floor", "ceil", "round", "sqrt", "pow", "min", "max",
            "int", "toInt", "parseInt", "float", "toFloat", "parseFloat", "toString",
            "random", "randomInt", "now", "time", "sleep",
            "len", "length", "push", "pop", "shift", "unshift", "slice", "keys",
            "values", "has", "hasKey", "delete", "reverse", "concat", "range", "sort",
            "map", "filter", "reduce", "forEach", "find", "findIndex", "every", "some",
            "clone", "str",
            "readFile", "writeFile", "appendFile", "exists", "fileExists", "remove",
            "mkdir", "rename",
            "jsonParse", "jsonStringify",
            "httpGet", "httpPost", "httpPut", "httpDelete", "httpPatch", "http",
            "createServer", "serverRoute", "serverListen", "serverHandle", "serverStop",
            "typeof", "isArray", "isObject", "isString", "isNumber", "isFunc", "isFunction",
            "assert",
            "setTimeout", "setInterval", "clearTimer", "clearTimeout", "clearInterval",
        ]
        .into_iter()
        .collect()
    };
}

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(name)
}

pub fn call(interp: &mut Interpreter, name: &str, args: &[Value], _scope: &ScopeRef) -> JayResult<Value> {
    if let Some(r) = builtins::io::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::strings::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::numeric::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::containers::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::files::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::json::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::http::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::http_server::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::introspection::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::assert::dispatch(interp, name, args) {
        return r;
    }
    if let Some(r) = builtins::timer_builtins::dispatch(interp, name, args) {
        return r;
    }
    Err(interp.err(0, ErrorKind::UndefinedFunction(name.to_string())))
}

/// `foo.bar(args)` where `foo` isn't a class instance: treated as calling
/// the builtin named `bar` with `foo` prepended, so array/string/object
/// "methods" and free functions share one implementation (§6.2).
pub fn call_method_builtin(interp: &mut Interpreter, base: &Value, name: &str, args: &[Value]) -> JayResult<Value> {
    let mut full_args = Vec::with_capacity(args.len() + 1);
    full_args.push(base.clone());
    full_args.extend_from_slice(args);
    let scope = interp.global.clone();
    call(interp, name, &full_args, &scope)
}

/// Property-style access on arrays/strings (`arr.length`), separate from
/// method calls since it has no argument list.
pub fn array_or_string_property(base: &Value, name: &str) -> JayResult<Value> {
    match (base, name) {
        (Value::Array(a), "length") => Ok(Value::Int(a.borrow().len() as i64)),
        (Value::Str(s), "length") => Ok(Value::Int(s.chars().count() as i64)),
        _ => Ok(Value::Null),
    }
}
