//! Lexical scope chain (§3.4).
//!
//! A scope is an ordered list of `(name, value, const_flag)` records plus a
//! parent pointer, shared via `Rc<RefCell<_>>` so closures and call frames
//! can hold a live handle without copying the whole chain.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::errors::{ErrorKind, JayError, JayResult};
use crate::value::Value;

pub type ScopeRef = Rc<RefCell<Scope>>;

struct Binding {
    value: Value,
    is_const: bool,
}

pub struct Scope {
    bindings: IndexMap<String, Binding>,
    parent: Option<ScopeRef>,
}

impl Scope {
    pub fn new(parent: Option<ScopeRef>) -> ScopeRef {
        Rc::new(RefCell::new(Scope { bindings: IndexMap::new(), parent }))
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.parent.clone()
    }

    /// Defines `name` in this scope. Re-definition of an existing *local*
    /// binding updates it in place (preserving insertion order) rather than
    /// shadowing, matching `scope_def` in the original source; it still
    /// rejects redefining a const.
    pub fn define(&mut self, name: &str, value: Value, is_const: bool, line: usize, file: &str) -> JayResult<()> {
        if let Some(existing) = self.bindings.get(name) {
            if existing.is_const {
                return Err(JayError::new(file, line, ErrorKind::ConstReassign(name.to_string())));
            }
        }
        self.bindings.insert(name.to_string(), Binding { value, is_const });
        Ok(())
    }

    fn find_local(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// Looks up `name` by walking from `scope` toward the root, returning a
/// value copy plus whether the binding is const (used by `++`/`--`).
pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
    let mut cur = Some(scope.clone());
    while let Some(s) = cur {
        let b = s.borrow();
        if let Some(binding) = b.bindings.get(name) {
            return Some(binding.value.clone());
        }
        cur = b.parent.clone();
    }
    None
}

/// Defines `name` locally in `scope` (creating or updating it in place),
/// per §3.4's "local definition creates in the current scope" rule.
pub fn define_local(scope: &ScopeRef, name: &str, value: Value, is_const: bool, line: usize, file: &str) -> JayResult<()> {
    scope.borrow_mut().define(name, value, is_const, line, file)
}

/// Implements the assignment rule of §3.4: update the current scope's
/// binding if it exists there; else update the nearest non-global ancestor
/// that has it; else define locally.
pub fn assign(scope: &ScopeRef, global: &ScopeRef, name: &str, value: Value, line: usize, file: &str) -> JayResult<()> {
    if scope.borrow().find_local(name) {
        return update_in_scope(scope, name, value, line, file);
    }
    let mut cur = scope.borrow().parent();
    while let Some(s) = cur {
        if Rc::ptr_eq(&s, global) {
            break;
        }
        if s.borrow().find_local(name) {
            return update_in_scope(&s, name, value, line, file);
        }
        cur = s.borrow().parent();
    }
    define_local(scope, name, value, false, line, file)
}

fn update_in_scope(scope: &ScopeRef, name: &str, value: Value, line: usize, file: &str) -> JayResult<()> {
    let mut s = scope.borrow_mut();
    let binding = s.bindings.get_mut(name).expect("checked present by caller");
    if binding.is_const {
        return Err(JayError::new(file, line, ErrorKind::ConstReassign(name.to_string())));
    }
    binding.value = value;
    Ok(())
}

/// Writes into whichever scope along the chain already owns `name`
/// (used by `++`/`--` and compound assignment, which always target an
/// existing binding).
pub fn assign_existing(scope: &ScopeRef, name: &str, value: Value, line: usize, file: &str) -> JayResult<()> {
    let mut cur = Some(scope.clone());
    while let Some(s) = cur {
        if s.borrow().find_local(name) {
            return update_in_scope(&s, name, value, line, file);
        }
        cur = s.borrow().parent();
    }
    Err(JayError::new(file, line, ErrorKind::UndefinedVariable(name.to_string())))
}

pub fn is_const(scope: &ScopeRef, name: &str) -> bool {
    let mut cur = Some(scope.clone());
    while let Some(s) = cur {
        let b = s.borrow();
        if let Some(binding) = b.bindings.get(name) {
            return binding.is_const;
        }
        cur = b.parent.clone();
    }
    false
}

/// Snapshot of every binding reachable from `scope`, walking innermost to
/// outermost so inner bindings shadow outer ones — used both for closure
/// capture and module-export collection.
pub fn snapshot_all(scope: &ScopeRef) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    let mut cur = Some(scope.clone());
    while let Some(s) = cur {
        let b = s.borrow();
        for (k, v) in b.bindings.iter() {
            out.entry(k.clone()).or_insert_with(|| v.value.clone());
        }
        cur = b.parent.clone();
    }
    out
}

/// Snapshot of just the bindings in `names`, used for arrow-closure capture:
/// a read-only copy of each free variable's value at closure-creation time,
/// rather than a live link back into the enclosing scope.
pub fn snapshot_names(scope: &ScopeRef, names: &std::collections::HashSet<String>) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    for name in names {
        if let Some(v) = lookup(scope, name) {
            out.insert(name.clone(), v);
        }
    }
    out
}

/// Copies only the bindings defined directly in `scope` (not ancestors),
/// preserving insertion order — used when building a module's property map.
pub fn local_bindings(scope: &ScopeRef) -> IndexMap<String, Value> {
    scope.borrow().bindings.iter().map(|(k, b)| (k.clone(), b.value.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let global = Scope::new(None);
        define_local(&global, "x", Value::Int(1), false, 0, "<test>").unwrap();
        let child = Scope::new(Some(global.clone()));
        assert!(matches!(lookup(&child, "x"), Some(Value::Int(1))));
        assert!(lookup(&child, "missing").is_none());
    }

    #[test]
    fn define_local_shadows_without_touching_parent() {
        let global = Scope::new(None);
        define_local(&global, "x", Value::Int(1), false, 0, "<test>").unwrap();
        let child = Scope::new(Some(global.clone()));
        define_local(&child, "x", Value::Int(2), false, 0, "<test>").unwrap();
        assert!(matches!(lookup(&child, "x"), Some(Value::Int(2))));
        assert!(matches!(lookup(&global, "x"), Some(Value::Int(1))));
    }

    #[test]
    fn assign_updates_nearest_ancestor_before_global() {
        let global = Scope::new(None);
        define_local(&global, "x", Value::Int(0), false, 0, "<test>").unwrap();
        let outer = Scope::new(Some(global.clone()));
        define_local(&outer, "x", Value::Int(1), false, 0, "<test>").unwrap();
        let inner = Scope::new(Some(outer.clone()));
        assign(&inner, &global, "x", Value::Int(9), 0, "<test>").unwrap();
        assert!(matches!(lookup(&outer, "x"), Some(Value::Int(9))));
        assert!(matches!(lookup(&global, "x"), Some(Value::Int(0))));
    }

    #[test]
    fn assign_to_unbound_name_defines_locally() {
        let global = Scope::new(None);
        let child = Scope::new(Some(global.clone()));
        assign(&child, &global, "fresh", Value::Int(5), 0, "<test>").unwrap();
        assert!(matches!(lookup(&child, "fresh"), Some(Value::Int(5))));
        assert!(lookup(&global, "fresh").is_none());
    }

    #[test]
    fn reassigning_a_const_binding_errors() {
        let global = Scope::new(None);
        define_local(&global, "x", Value::Int(1), true, 0, "<test>").unwrap();
        let err = assign(&global, &global, "x", Value::Int(2), 0, "<test>").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ConstReassign(n) if n == "x"));
    }

    #[test]
    fn snapshot_names_skips_unbound_names() {
        let global = Scope::new(None);
        define_local(&global, "a", Value::Int(1), false, 0, "<test>").unwrap();
        let wanted: std::collections::HashSet<String> =
            ["a".to_string(), "b".to_string()].into_iter().collect();
        let snap = snapshot_names(&global, &wanted);
        assert_eq!(snap.len(), 1);
        assert!(snap.contains_key("a"));
    }

    #[test]
    fn is_const_reports_false_for_plain_bindings() {
        let global = Scope::new(None);
        define_local(&global, "a", Value::Int(1), false, 0, "<test>").unwrap();
        define_local(&global, "b", Value::Int(2), true, 0, "<test>").unwrap();
        assert!(!is_const(&global, "a"));
        assert!(is_const(&global, "b"));
    }
}
