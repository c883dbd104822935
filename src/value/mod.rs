//! The runtime value model (§3.3).
//!
//! Heap-backed variants (array, object, instance, module, closure) are
//! `Rc`-shared so containers, instances, modules, and closures can be
//! aliased across scopes; scalars (`null`, `bool`, `int`, `float`, `string`)
//! are copied by value. This reproduces the original's manual
//! `val_incref`/`val_decref` discipline with ordinary Rust ownership.

mod class;

pub use class::{ClassDef, ClassRegistry, Method};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Node;
use crate::scope::ScopeRef;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// Insertion-order preserving map, matching §3.3's object invariant.
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

#[derive(Debug, Clone)]
pub struct Closure {
    pub params: Vec<String>,
    pub body: Rc<Vec<Node>>,
    /// Values captured by name at arrow-creation time: a read-only
    /// snapshot, not a live link back to the enclosing scope.
    pub captured: Rc<IndexMap<String, Value>>,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub class: Rc<ClassDef>,
    pub props: ObjectRef,
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<String>),
    Array(ArrayRef),
    Object(ObjectRef),
    /// A module is isomorphic to an object but keeps a distinct tag for
    /// `typeof`, per §3.3.
    Module(ObjectRef),
    /// By-name reference to an entry in the interpreter's function table.
    FunctionRef(Rc<String>),
    /// By-name reference to an entry in the interpreter's class registry.
    ClassRef(Rc<String>),
    Instance(Rc<Instance>),
    Closure(Rc<Closure>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(Rc::new(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Module(_) => "module",
            Value::FunctionRef(_) => "function",
            Value::ClassRef(_) => "class",
            Value::Instance(_) => "instance",
            Value::Closure(_) => "function",
        }
    }

    /// Truthiness per §4.3.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Object(o) | Value::Module(o) => !o.borrow().is_empty(),
            Value::FunctionRef(_) | Value::ClassRef(_) | Value::Instance(_) | Value::Closure(_) => true,
        }
    }

    /// Numeric coercion used by comparisons and arithmetic.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Bool(b) => if *b { 1.0 } else { 0.0 },
            Value::Str(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.as_str().to_string(),
            Value::Array(a) => {
                let items: Vec<String> = a.borrow().iter().map(Value::to_display_string).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(o) | Value::Module(o) => {
                let items: Vec<String> = o
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_display_string()))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Value::FunctionRef(n) => format!("<function {n}>"),
            Value::ClassRef(n) => format!("<class {n}>"),
            Value::Instance(i) => format!("<instance {}>", i.class.name),
            Value::Closure(_) => "<function>".to_string(),
        }
    }

    /// Identity/value equality used by `==`/`!=` and `case` atoms (§4.3):
    /// composites (array, object, instance, module, closure) compare by
    /// reference identity rather than structural equality.
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;
        let a_numeric = matches!(self, Int(_) | Float(_));
        let b_numeric = matches!(other, Int(_) | Float(_));
        if a_numeric && b_numeric {
            return self.to_number() == other.to_number();
        }
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Array(a), Array(b)) => Rc::ptr_eq(a, b),
            (Object(a), Object(b)) | (Module(a), Module(b)) => Rc::ptr_eq(a, b),
            (Instance(a), Instance(b)) => Rc::ptr_eq(a, b),
            (Closure(a), Closure(b)) => Rc::ptr_eq(a, b),
            (FunctionRef(a), FunctionRef(b)) => a == b,
            (ClassRef(a), ClassRef(b)) => a == b,
            _ => false,
        }
    }
}

pub fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// A live scheduled timer; owns its callback and the scope it should be
/// invoked in is always the global scope (callbacks take no arguments, §3.6).
#[derive(Debug, Clone)]
pub struct TimerCallback {
    pub callback: Value,
    pub scope: ScopeRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_float_compare_numerically_for_loose_eq() {
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(!Value::Int(2).loose_eq(&Value::Float(2.1)));
    }

    #[test]
    fn composite_values_compare_by_identity() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::Int(1)]);
        assert!(!a.loose_eq(&b), "distinct arrays with equal contents are not loosely equal");
        assert!(a.loose_eq(&a.clone()));
    }

    #[test]
    fn truthiness_matches_spec_table() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(Value::str("x").is_truthy());
        assert!(!Value::array(vec![]).is_truthy());
        assert!(Value::array(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn float_display_keeps_one_decimal_for_whole_numbers() {
        assert_eq!(Value::Float(3.0).to_display_string(), "3.0");
        assert_eq!(Value::Float(3.5).to_display_string(), "3.5");
    }

    #[test]
    fn string_to_number_coerces_leading_numeric_text() {
        assert_eq!(Value::str("42").to_number(), 42.0);
        assert_eq!(Value::str("not a number").to_number(), 0.0);
    }

    #[test]
    fn array_display_matches_source_like_syntax() {
        let arr = Value::array(vec![Value::Int(1), Value::str("a")]);
        assert_eq!(arr.to_display_string(), "[1, a]");
    }
}
