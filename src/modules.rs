//! Module loader (§3.7, §4.7).
//!
//! Mirrors `do_import`'s save/restore-state dance in the original: parse and
//! evaluate the target file in a scope of its own, then harvest whatever it
//! defined (top-level bindings plus any functions/classes it registered)
//! into a single object value. Imports are memoized by resolved path so a
//! module is only ever evaluated once, matching §4.7's caching rule.
//!
//! State lives on [`Interpreter`] directly (rather than behind its own
//! handle) so a module that itself imports another module recurses through
//! ordinary `&mut Interpreter` calls instead of juggling two structs that
//! both want exclusive access to it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::Node;
use crate::errors::{ErrorKind, JayError, JayResult};
use crate::interpreter::Interpreter;
use crate::parser;
use crate::scope::{self, Scope};
use crate::value::Value;

#[derive(Default)]
pub struct ModuleCache {
    entries: HashMap<PathBuf, Value>,
    loading: Vec<PathBuf>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn load(interp: &mut Interpreter, path: &str) -> JayResult<Value> {
    let resolved = resolve(interp, path)?;
    if let Some(cached) = interp.modules.entries.get(&resolved) {
        return Ok(cached.clone());
    }
    if interp.modules.loading.contains(&resolved) {
        return Err(JayError::new(
            interp.current_file.clone(),
            0,
            ErrorKind::ImportFailed(format!("circular import of '{}'", resolved.display())),
        ));
    }

    let source = std::fs::read_to_string(&resolved).map_err(|e| {
        JayError::new(interp.current_file.clone(), 0, ErrorKind::ImportFailed(format!("{}: {e}", resolved.display())))
    })?;

    interp.modules.loading.push(resolved.clone());
    let result = evaluate_module(interp, &resolved, &source);
    interp.modules.loading.pop();
    let module_value = result?;
    interp.modules.entries.insert(resolved, module_value.clone());
    Ok(module_value)
}

fn resolve(interp: &Interpreter, path: &str) -> JayResult<PathBuf> {
    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        let base = Path::new(&interp.current_file).parent().unwrap_or_else(|| Path::new("."));
        base.join(candidate)
    };
    let joined = if joined.extension().is_none() { joined.with_extension("jay") } else { joined };
    Ok(joined.canonicalize().unwrap_or(joined))
}

fn evaluate_module(interp: &mut Interpreter, resolved: &Path, source: &str) -> JayResult<Value> {
    let file_name = resolved.display().to_string();
    let program = parser::parse(source, file_name.clone())?;

    let saved_file = std::mem::replace(&mut interp.current_file, file_name);
    let module_scope = Scope::new(Some(interp.global.clone()));

    let outcome = run_statements(interp, &program, &module_scope);

    interp.current_file = saved_file;
    outcome?;

    let mut props = scope::local_bindings(&module_scope);
    // Top-level `func`/`class` declarations register globally rather than
    // in `module_scope`'s own bindings; expose those defined during this
    // load too, so `import "./m" as m; m.helper()` works.
    for stmt in &program {
        if let Node::Function { name: Some(name), .. } = stmt {
            if interp.functions.contains_key(name) {
                props.insert(name.clone(), Value::FunctionRef(std::rc::Rc::new(name.clone())));
            }
        }
        if let Node::Class { name, .. } = stmt {
            props.insert(name.clone(), Value::ClassRef(std::rc::Rc::new(name.clone())));
        }
    }

    Ok(Value::Module(std::rc::Rc::new(std::cell::RefCell::new(props))))
}

fn run_statements(interp: &mut Interpreter, program: &[Node], scope: &crate::scope::ScopeRef) -> JayResult<()> {
    for stmt in program {
        interp.eval(stmt, scope)?;
    }
    Ok(())
}
