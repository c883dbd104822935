//! Console and input builtins (§6.2).

use std::io::{self, Write};

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(_interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "print" | "println" => Some(print_impl(args)),
        "input" => Some(input_impl(args)),
        _ => None,
    }
}

fn print_impl(args: &[Value]) -> JayResult<Value> {
    let line: Vec<String> = args.iter().map(Value::to_display_string).collect();
    println!("{}", line.join(" "));
    Ok(Value::Null)
}

fn input_impl(args: &[Value]) -> JayResult<Value> {
    if let Some(prompt) = args.first() {
        print!("{}", prompt.to_display_string());
        let _ = io::stdout().flush();
    }
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    while buf.ends_with('\n') || buf.ends_with('\r') {
        buf.pop();
    }
    Ok(Value::str(buf))
}
