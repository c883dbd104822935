//! `jay`: a small tree-walking interpreter.
//!
//! The crate is organized the way the original single-file interpreter's
//! phases were organized, just split one module per phase: lex, parse,
//! build a value model and scope chain, then walk the tree.

pub mod ast;
pub mod builtins;
pub mod errors;
pub mod interpreter;
pub mod lexer;
pub mod manifest;
pub mod modules;
pub mod parser;
pub mod scope;
pub mod timers;
pub mod value;

pub use errors::{ErrorKind, JayError, JayResult};
pub use interpreter::Interpreter;
pub use value::Value;

/// Parses and runs a complete program from source, starting from a fresh
/// interpreter whose `current_file` is `file` (used for error messages and
/// relative `import` resolution).
pub fn run_source(source: &str, file: impl Into<String>, args: Vec<String>) -> JayResult<()> {
    let file = file.into();
    let program = parser::parse(source, file.clone())?;
    let mut interp = Interpreter::new(file);
    let args_array = Value::array(args.into_iter().map(Value::str).collect());
    let current_file = interp.current_file.clone();
    scope::define_local(&interp.global, "ARGS", args_array, true, 0, &current_file)?;
    interp.run_program(&program)
}
