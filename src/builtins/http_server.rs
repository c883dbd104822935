//! Stateful HTTP server builtins (§5, §6.2), grounded in jeem.c's
//! `HttpServer`/`HttpRoute`/`g_server` singleton and `server_handle_one`'s
//! select-with-timeout accept loop, reimplemented atop `std::net::TcpListener`
//! set non-blocking instead of raw BSD `select()`.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::errors::{ErrorKind, JayError, JayResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

/// One registered `serverRoute(method, path, handler)` entry.
struct Route {
    method: String,
    path: String,
    handler: Value,
}

/// Live state behind a single `createServer` call, held on the interpreter
/// so `serverRoute`/`serverListen`/`serverHandle`/`serverStop` (separate
/// builtin calls) can all see it, matching the original's `g_server` global.
pub struct HttpServerState {
    listener: TcpListener,
    port: u16,
    routes: Vec<Route>,
    running: bool,
}

pub fn dispatch(interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "createServer" => Some(create_server_impl(interp, args)),
        "serverRoute" => Some(Ok(server_route_impl(interp, args))),
        "serverHandle" => Some(server_handle_impl(interp, args)),
        "serverListen" => Some(server_listen_impl(interp, args)),
        "serverStop" => Some(Ok(server_stop_impl(interp))),
        _ => None,
    }
}

fn create_server_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let port = args.first().map(Value::to_number).unwrap_or(8080.0) as u16;
    let listener = TcpListener::bind(("0.0.0.0", port))
        .map_err(|e| JayError::new(interp.current_file.clone(), 0, ErrorKind::Other(format!("bind failed: {e}"))))?;
    listener
        .set_nonblocking(true)
        .map_err(|e| JayError::new(interp.current_file.clone(), 0, ErrorKind::Other(format!("bind failed: {e}"))))?;
    interp.http_server = Some(HttpServerState { listener, port, routes: Vec::new(), running: false });
    let mut map = IndexMap::new();
    map.insert("port".to_string(), Value::Int(port as i64));
    Ok(Value::object(map))
}

/// Registers `handler` for `method path`, matching `bi_serverRoute`'s
/// argument validation (string method/path, closure/function handler).
fn server_route_impl(interp: &mut Interpreter, args: &[Value]) -> Value {
    let (Some(Value::Str(method)), Some(Value::Str(path)), Some(handler)) = (args.first(), args.get(1), args.get(2))
    else {
        return Value::Bool(false);
    };
    if !matches!(handler, Value::Closure(_) | Value::FunctionRef(_)) {
        return Value::Bool(false);
    }
    let Some(server) = interp.http_server.as_mut() else { return Value::Bool(false) };
    server.routes.push(Route { method: method.as_str().to_string(), path: path.as_str().to_string(), handler: handler.clone() });
    Value::Bool(true)
}

fn server_stop_impl(interp: &mut Interpreter) -> Value {
    match interp.http_server.as_mut() {
        Some(server) => {
            server.running = false;
            Value::Bool(true)
        }
        None => Value::Bool(false),
    }
}

/// One poll-and-maybe-serve-one-request pass, non-blocking beyond
/// `timeout_ms`, matching `server_handle_one`'s `select()` timeout.
fn server_handle_impl(interp: &mut Interpreter, args: &[Value]) -> JayResult<Value> {
    let timeout_ms = args.first().map(Value::to_number).unwrap_or(100.0).max(0.0) as u64;
    Ok(Value::Bool(handle_one(interp, timeout_ms)?))
}

fn handle_one(interp: &mut Interpreter, timeout_ms: u64) -> JayResult<bool> {
    let Some(server) = interp.http_server.as_ref() else { return Ok(false) };
    if !server.running {
        return Ok(false);
    }

    let deadline = Instant::now() + Duration::from_millis(timeout_ms.max(1));
    let stream = loop {
        let accepted = interp.http_server.as_ref().expect("checked above").listener.accept();
        match accepted {
            Ok((stream, _addr)) => break Some(stream),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    break None;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(_) => break None,
        }
    };
    let Some(mut stream) = stream else { return Ok(false) };
    stream.set_nonblocking(false).ok();

    let mut buf = [0u8; 8192];
    let read = stream.read(&mut buf).unwrap_or(0);
    if read == 0 {
        return Ok(false);
    }
    let raw = String::from_utf8_lossy(&buf[..read]);
    let mut lines = raw.splitn(2, "\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("GET").to_string();
    let path = parts.next().unwrap_or("/").to_string();
    let body = raw.split("\r\n\r\n").nth(1).unwrap_or("").to_string();

    let server = interp.http_server.as_ref().expect("checked above");
    let route = server.routes.iter().find(|r| r.method == method && r.path == path).map(|r| r.handler.clone());

    let response = match route {
        Some(handler) => {
            let scope = interp.global.clone();
            let mut req = IndexMap::new();
            req.insert("method".to_string(), Value::str(method));
            req.insert("path".to_string(), Value::str(path));
            req.insert("body".to_string(), Value::str(body));
            let result = interp.call_value(&handler, &[Value::object(req)], &scope, 0)?;
            render_response(&result)
        }
        None => http_response(404, "text/html", "Not Found"),
    };
    let _ = stream.write_all(response.as_bytes());
    Ok(true)
}

/// Handler results shaped `{ status, body, contentType }` drive the response
/// fields explicitly; anything else is stringified as a 200 `text/html` body,
/// matching `server_handle_one`'s two branches.
fn render_response(result: &Value) -> String {
    if let Value::Object(o) = result {
        let map = o.borrow();
        let status = map.get("status").map(|v| v.to_number() as u16).unwrap_or(200);
        let body = map.get("body").map(Value::to_display_string).unwrap_or_default();
        let content_type = match map.get("contentType") {
            Some(Value::Str(s)) => s.as_str().to_string(),
            _ => "text/html".to_string(),
        };
        return http_response(status, &content_type, &body);
    }
    http_response(200, "text/html", &result.to_display_string())
}

fn http_response(status: u16, content_type: &str, body: &str) -> String {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Error",
    };
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    )
}

/// Blocks the script (not the process forever, just this call) serving
/// requests and draining timers each pass until `serverStop()` clears the
/// running flag, matching `bi_serverListen`'s `while(running) { ...; process_timers(); }`.
fn server_listen_impl(interp: &mut Interpreter, _args: &[Value]) -> JayResult<Value> {
    let Some(server) = interp.http_server.as_mut() else { return Ok(Value::Null) };
    server.running = true;
    println!("Server listening on port {} (Ctrl+C to stop)", server.port);
    loop {
        let still_running = match interp.http_server.as_ref() {
            Some(s) => s.running,
            None => false,
        };
        if !still_running {
            break;
        }
        handle_one(interp, 100)?;
        interp.process_timers_once()?;
    }
    Ok(Value::Null)
}
