//! Filesystem builtins (§6.2), mirroring jeem.c's `readFile`/`writeFile`/
//! `fileExists` trio.

use std::fs;

use crate::errors::JayResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn dispatch(_interp: &mut Interpreter, name: &str, args: &[Value]) -> Option<JayResult<Value>> {
    match name {
        "readFile" => Some(Ok(read_file_impl(args))),
        "writeFile" => Some(Ok(write_file_impl(args))),
        "appendFile" => Some(Ok(append_file_impl(args))),
        "exists" | "fileExists" => Some(Ok(exists_impl(args))),
        "remove" => Some(Ok(remove_impl(args))),
        "mkdir" => Some(Ok(mkdir_impl(args))),
        "rename" => Some(Ok(rename_impl(args))),
        _ => None,
    }
}

fn read_file_impl(args: &[Value]) -> Value {
    let path = args.first().map(Value::to_display_string).unwrap_or_default();
    match fs::read_to_string(path) {
        Ok(s) => Value::str(s),
        Err(_) => Value::Null,
    }
}

fn write_file_impl(args: &[Value]) -> Value {
    let path = args.first().map(Value::to_display_string).unwrap_or_default();
    let contents = args.get(1).map(Value::to_display_string).unwrap_or_default();
    Value::Bool(fs::write(path, contents).is_ok())
}

fn exists_impl(args: &[Value]) -> Value {
    let path = args.first().map(Value::to_display_string).unwrap_or_default();
    Value::Bool(std::path::Path::new(&path).exists())
}

fn append_file_impl(args: &[Value]) -> Value {
    use std::io::Write;
    let path = args.first().map(Value::to_display_string).unwrap_or_default();
    let contents = args.get(1).map(Value::to_display_string).unwrap_or_default();
    let result = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(contents.as_bytes()));
    Value::Bool(result.is_ok())
}

fn remove_impl(args: &[Value]) -> Value {
    let path = args.first().map(Value::to_display_string).unwrap_or_default();
    Value::Bool(fs::remove_file(&path).is_ok() || fs::remove_dir(&path).is_ok())
}

fn mkdir_impl(args: &[Value]) -> Value {
    let path = args.first().map(Value::to_display_string).unwrap_or_default();
    Value::Bool(fs::create_dir_all(path).is_ok())
}

fn rename_impl(args: &[Value]) -> Value {
    let from = args.first().map(Value::to_display_string).unwrap_or_default();
    let to = args.get(1).map(Value::to_display_string).unwrap_or_default();
    Value::Bool(fs::rename(from, to).is_ok())
}
