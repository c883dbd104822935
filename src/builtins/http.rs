//! Blocking HTTP client builtins (§5, §6.2), grounded in jeem.c's
//! `httpGet`/`httpPost` pair but backed by `ureq` instead of a hand-rolled
//! socket client — the single-threaded synchronous execution model (§5)
//! makes a blocking client the right fit, same as jeem.c's own blocking
//! `httpRequest`.

use indexmap::IndexMap;

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(_interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "httpGet" => Some(Ok(get_impl(args))),
        "httpPost" => Some(Ok(request_with_body(ureq::post(&url_arg(args, 0)), args))),
        "httpPut" => Some(Ok(request_with_body(ureq::put(&url_arg(args, 0)), args))),
        "httpPatch" => Some(Ok(request_with_body(ureq::request("PATCH", &url_arg(args, 0)), args))),
        "httpDelete" => Some(Ok(delete_impl(args))),
        "http" => Some(Ok(generic_impl(args))),
        _ => None,
    }
}

fn url_arg(args: &[Value], i: usize) -> String {
    args.get(i).map(Value::to_display_string).unwrap_or_default()
}

fn response_object(status: u16, body: String) -> Value {
    let mut map = IndexMap::new();
    map.insert("status".to_string(), Value::Int(status as i64));
    map.insert("body".to_string(), Value::str(body));
    Value::object(map)
}

fn error_object(message: String) -> Value {
    let mut map = IndexMap::new();
    map.insert("status".to_string(), Value::Int(0));
    map.insert("body".to_string(), Value::Null);
    map.insert("error".to_string(), Value::str(message));
    Value::object(map)
}

fn get_impl(args: &[Value]) -> Value {
    let url = args.first().map(Value::to_display_string).unwrap_or_default();
    match ureq::get(&url).call() {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.into_string().unwrap_or_default();
            response_object(status, body)
        }
        Err(e) => error_object(e.to_string()),
    }
}

/// Shared body/content-type handling for `httpPost`/`httpPut`/`httpPatch`,
/// matching jeem.c's `http_request` (body + `contentType`, both optional,
/// defaulting to `application/json`).
fn request_with_body(req: ureq::Request, args: &[Value]) -> Value {
    let body = args.get(1).map(Value::to_display_string).unwrap_or_default();
    let content_type = args.get(2).map(Value::to_display_string).unwrap_or_else(|| "application/json".to_string());
    match req.set("Content-Type", &content_type).send_string(&body) {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.into_string().unwrap_or_default();
            response_object(status, body)
        }
        Err(e) => error_object(e.to_string()),
    }
}

fn delete_impl(args: &[Value]) -> Value {
    let url = url_arg(args, 0);
    match ureq::delete(&url).call() {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.into_string().unwrap_or_default();
            response_object(status, body)
        }
        Err(e) => error_object(e.to_string()),
    }
}

/// `http(method, url, body?, contentType?)`, matching jeem.c's `bi_http`.
fn generic_impl(args: &[Value]) -> Value {
    let method = args.first().map(Value::to_display_string).unwrap_or_default();
    let url = url_arg(args, 1);
    match method.to_uppercase().as_str() {
        "GET" => get_impl(&[Value::str(url)]),
        "DELETE" => delete_impl(&[Value::str(url)]),
        other => {
            let req = ureq::request(other, &url);
            let rest = args.get(2..).unwrap_or(&[]);
            let shifted: Vec<Value> = std::iter::once(Value::str(url.clone())).chain(rest.iter().cloned()).collect();
            request_with_body(req, &shifted)
        }
    }
}
