//! Tree-walking evaluator (§3, §4.4-§4.6).
//!
//! The interpreter owns every piece of process-wide state that the original
//! kept in global C variables: the function table, the class registry, the
//! module cache, the timer queue, and the global scope. Control flow that
//! used to be carried through `returning`/`breaking`/`continuing` flags is
//! instead carried as the return value of [`Interpreter::eval`].

mod builtins_dispatch;
mod free_vars;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{BinOp, CaseBranch, CompoundOp, MatchAtom, MethodDef, Node, UnOp};
use crate::errors::{ErrorKind, JayError, JayResult};
use crate::lexer::TemplatePart;
use crate::manifest::Manifest;
use crate::modules::{self, ModuleCache};
use crate::scope::{self, Scope, ScopeRef};
use crate::timers::TimerQueue;
use crate::value::{ClassDef, ClassRegistry, Closure, Instance, Method, Value};

/// A user-defined (non-closure) function: `func name(params) { body }`.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: Rc<Vec<Node>>,
}

/// The result of evaluating one syntax-tree node. Expression nodes always
/// produce `Value`; only `return`/`break`/`continue` and the statements that
/// host them produce the other variants, and those never escape a function
/// call (see [`Interpreter::call_function`]).
pub enum EvalOutcome {
    Value(Value),
    Return(Value),
    Break,
    Continue,
}

impl EvalOutcome {
    fn into_value(self) -> Value {
        match self {
            EvalOutcome::Value(v) => v,
            EvalOutcome::Return(v) => v,
            EvalOutcome::Break | EvalOutcome::Continue => Value::Null,
        }
    }
}

pub struct Interpreter {
    pub functions: HashMap<String, Rc<FunctionDef>>,
    pub classes: ClassRegistry,
    pub global: ScopeRef,
    pub timers: TimerQueue,
    pub modules: ModuleCache,
    pub manifest: Option<Manifest>,
    /// Live state for `createServer`/`serverRoute`/.../`serverStop`, one
    /// server per interpreter (§5), matching the original's single `g_server`.
    pub http_server: Option<crate::builtins::http_server::HttpServerState>,
    /// `this` for the method currently executing, if any.
    current_self: Option<Rc<Instance>>,
    /// The class a method body was defined on, used to resolve `super`.
    current_class: Option<Rc<ClassDef>>,
    /// Path of the file currently executing, for error messages and
    /// import-path resolution.
    pub current_file: String,
    depth: usize,
}

const MAX_CALL_DEPTH: usize = 2000;

impl Interpreter {
    pub fn new(entry_file: impl Into<String>) -> Self {
        let mut interp = Interpreter {
            functions: HashMap::new(),
            classes: ClassRegistry::default(),
            global: Scope::new(None),
            timers: TimerQueue::new(),
            modules: ModuleCache::new(),
            manifest: None,
            http_server: None,
            current_self: None,
            current_class: None,
            current_file: entry_file.into(),
            depth: 0,
        };
        interp.define_globals();
        interp
    }

    /// Pre-populates the root scope with the constants the language
    /// promises every script, matching the original's `init_globals()`
    /// (§6.3).
    fn define_globals(&mut self) {
        let global = self.global.clone();
        let file = self.current_file.clone();
        let _ = scope::define_local(&global, "PI", Value::Float(std::f64::consts::PI), true, 0, &file);
        let _ = scope::define_local(&global, "E", Value::Float(std::f64::consts::E), true, 0, &file);
        let _ = scope::define_local(&global, "VERSION", Value::str("3.0"), true, 0, &file);
    }

    fn err(&self, line: usize, kind: ErrorKind) -> JayError {
        JayError::new(self.current_file.clone(), line, kind)
    }

    /// Runs a whole program: hoists top-level function/class declarations
    /// first (so forward references work, matching the original's
    /// single-pass-then-eval loading), then evaluates statements in order.
    pub fn run_program(&mut self, program: &[Node]) -> JayResult<()> {
        self.hoist(program)?;
        let scope = self.global.clone();
        for stmt in program {
            if matches!(stmt, Node::Function { name: Some(_), .. } | Node::Class { .. }) {
                continue;
            }
            self.eval(stmt, &scope)?;
        }
        self.drain_timers()?;
        Ok(())
    }

    fn hoist(&mut self, program: &[Node]) -> JayResult<()> {
        for stmt in program {
            match stmt {
                Node::Function { name: Some(name), params, body } => {
                    self.functions.insert(
                        name.clone(),
                        Rc::new(FunctionDef { params: params.clone(), body: Rc::new(body.clone()) }),
                    );
                }
                Node::Class { name, parent, methods } => {
                    self.register_class(name.clone(), parent.clone(), methods)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn register_class(&mut self, name: String, parent: Option<String>, methods: &[MethodDef]) -> JayResult<()> {
        let mut map = std::collections::HashMap::new();
        for m in methods {
            map.insert(m.name.clone(), Method { params: m.params.clone(), body: Rc::new(m.body.clone()) });
        }
        self.classes.register(ClassDef { name, parent, methods: map });
        Ok(())
    }

    /// Runs the cooperative timer loop until no timers remain, matching the
    /// original's post-program `while (has_active_timers()) { ...; sleep }`
    /// drain, but backed by a min-heap instead of a linear scan (§4.8).
    pub fn drain_timers(&mut self) -> JayResult<()> {
        while self.process_timers_once()? {}
        Ok(())
    }

    /// Fires at most one due timer, returning whether one fired. Used by
    /// `serverListen` to interleave timer processing with the accept loop
    /// without looping forever on an uncancelled `setInterval`, matching
    /// the original's per-pass `process_timers()` call.
    pub fn process_timers_once(&mut self) -> JayResult<bool> {
        let Some(fired) = self.timers.pop_due() else { return Ok(false) };
        let scope = fired.scope.clone();
        let rearm = fired.rearm();
        self.call_value(&fired.callback, &[], &scope, fired.line)?;
        if let Some(rearmed) = rearm {
            self.timers.reschedule(rearmed);
        }
        Ok(true)
    }

    // ---- statement/expression dispatch ----------------------------------

    pub fn eval(&mut self, node: &Node, scope: &ScopeRef) -> JayResult<EvalOutcome> {
        match node {
            Node::Literal(v) => Ok(EvalOutcome::Value(v.clone())),
            Node::Template(parts) => self.eval_template(parts, scope),
            Node::Array(items) => {
                let mut vals = Vec::with_capacity(items.len());
                for item in items {
                    vals.push(self.eval_value(item, scope)?);
                }
                Ok(EvalOutcome::Value(Value::array(vals)))
            }
            Node::Object(items) => {
                let mut map = IndexMap::new();
                for (k, v) in items {
                    map.insert(k.clone(), self.eval_value(v, scope)?);
                }
                Ok(EvalOutcome::Value(Value::object(map)))
            }
            Node::Variable(name) => {
                if name == "ARGS" {
                    if let Some(v) = scope::lookup(&self.global, name) {
                        return Ok(EvalOutcome::Value(v));
                    }
                }
                scope::lookup(scope, name)
                    .map(EvalOutcome::Value)
                    .ok_or_else(|| self.err(0, ErrorKind::UndefinedVariable(name.clone())))
            }
            Node::Assign { name, value, is_const } => {
                let v = self.eval_value(value, scope)?;
                if *is_const {
                    scope::define_local(scope, name, v.clone(), true, 0, &self.current_file)?;
                } else {
                    scope::assign(scope, &self.global, name, v.clone(), 0, &self.current_file)?;
                }
                Ok(EvalOutcome::Value(v))
            }
            Node::CompoundAssign { op, name, value } => {
                let current = scope::lookup(scope, name)
                    .ok_or_else(|| self.err(0, ErrorKind::UndefinedVariable(name.clone())))?;
                if scope::is_const(scope, name) {
                    return Err(self.err(0, ErrorKind::ConstModify(name.clone())));
                }
                let rhs = self.eval_value(value, scope)?;
                let result = apply_compound(&current, *op, &rhs, self)?;
                scope::assign_existing(scope, name, result.clone(), 0, &self.current_file)?;
                Ok(EvalOutcome::Value(result))
            }
            Node::IndexAssign { target, value } => {
                let (base, index) = match target.as_ref() {
                    Node::Index { base, index } => (self.eval_value(base, scope)?, self.eval_value(index, scope)?),
                    _ => unreachable!(),
                };
                let v = self.eval_value(value, scope)?;
                self.index_assign(&base, &index, v.clone())?;
                Ok(EvalOutcome::Value(v))
            }
            Node::MemberAssign { target, value } => {
                let (base, name) = match target.as_ref() {
                    Node::Member { base, name } => (self.eval_value(base, scope)?, name.clone()),
                    _ => unreachable!(),
                };
                let v = self.eval_value(value, scope)?;
                self.member_assign(&base, &name, v.clone())?;
                Ok(EvalOutcome::Value(v))
            }
            Node::Binary { op, left, right } => self.eval_binary(*op, left, right, scope),
            Node::Unary { op, operand } => self.eval_unary(*op, operand, scope),
            Node::Ternary { cond, then_branch, else_branch } => {
                let c = self.eval_value(cond, scope)?;
                if c.is_truthy() {
                    self.eval(then_branch, scope)
                } else {
                    self.eval(else_branch, scope)
                }
            }
            Node::Index { base, index } => {
                let b = self.eval_value(base, scope)?;
                let i = self.eval_value(index, scope)?;
                Ok(EvalOutcome::Value(self.index_get(&b, &i)?))
            }
            Node::Member { base, name } => {
                let b = self.eval_value(base, scope)?;
                Ok(EvalOutcome::Value(self.member_get(&b, name)?))
            }
            Node::Call { callee, args } => self.eval_call(callee, args, scope),
            Node::Block(stmts) => self.eval_block(stmts, scope),
            Node::If { cond, then_branch, else_branch } => {
                let c = self.eval_value(cond, scope)?;
                if c.is_truthy() {
                    self.eval(then_branch, scope)
                } else if let Some(e) = else_branch {
                    self.eval(e, scope)
                } else {
                    Ok(EvalOutcome::Value(Value::Null))
                }
            }
            Node::While { cond, body } => self.eval_while(cond, body, scope),
            Node::RangeFor { item, index, iterable, body } => self.eval_range_for(item, index, iterable, body, scope),
            Node::CountedFor { init, cond, update, body } => self.eval_counted_for(init, cond, update, body, scope),
            Node::Case { scrutinee, branches } => self.eval_case(scrutinee, branches, scope),
            Node::Break => Ok(EvalOutcome::Break),
            Node::Continue => Ok(EvalOutcome::Continue),
            Node::Return(value) => {
                let v = match value {
                    Some(e) => self.eval_value(e, scope)?,
                    None => Value::Null,
                };
                Ok(EvalOutcome::Return(v))
            }
            Node::Function { name: Some(name), params, body } => {
                self.functions.insert(
                    name.clone(),
                    Rc::new(FunctionDef { params: params.clone(), body: Rc::new(body.clone()) }),
                );
                Ok(EvalOutcome::Value(Value::FunctionRef(Rc::new(name.clone()))))
            }
            Node::Function { name: None, params, body } => {
                let free = free_vars::collect(body, params);
                let captured = scope::snapshot_names(scope, &free);
                Ok(EvalOutcome::Value(Value::Closure(Rc::new(Closure {
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    captured: Rc::new(captured),
                }))))
            }
            Node::Arrow { params, body } => {
                let free = free_vars::collect(body, params);
                let captured = scope::snapshot_names(scope, &free);
                Ok(EvalOutcome::Value(Value::Closure(Rc::new(Closure {
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    captured: Rc::new(captured),
                }))))
            }
            Node::Class { name, parent, methods } => {
                self.register_class(name.clone(), parent.clone(), methods)?;
                Ok(EvalOutcome::Value(Value::ClassRef(Rc::new(name.clone()))))
            }
            Node::New { class_name, args } => self.eval_new(class_name, args, scope),
            Node::This => self
                .current_self
                .clone()
                .map(|i| EvalOutcome::Value(Value::Instance(i)))
                .ok_or_else(|| self.err(0, ErrorKind::ThisOutsideMethod)),
            Node::Super => self
                .current_self
                .clone()
                .map(|i| EvalOutcome::Value(Value::Instance(i)))
                .ok_or_else(|| self.err(0, ErrorKind::SuperOutsideMethod)),
            Node::Import { path, alias } => {
                let module_value = modules::load(self, path)?;
                scope::define_local(&self.global, alias, module_value.clone(), false, 0, &self.current_file)?;
                Ok(EvalOutcome::Value(module_value))
            }
            Node::ExprStatement(e) => self.eval(e, scope),
        }
    }

    pub fn eval_value(&mut self, node: &Node, scope: &ScopeRef) -> JayResult<Value> {
        Ok(self.eval(node, scope)?.into_value())
    }

    fn eval_template(&mut self, parts: &[TemplatePart], scope: &ScopeRef) -> JayResult<EvalOutcome> {
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(s) => out.push_str(s),
                TemplatePart::Expr(src) => {
                    let node = crate::parser::Parser::new(src, self.current_file.clone())?.parse_expr()?;
                    let v = self.eval_value(&node, scope)?;
                    out.push_str(&v.to_display_string());
                }
            }
        }
        Ok(EvalOutcome::Value(Value::str(out)))
    }

    fn eval_block(&mut self, stmts: &[Node], parent: &ScopeRef) -> JayResult<EvalOutcome> {
        let scope = Scope::new(Some(parent.clone()));
        for stmt in stmts {
            match self.eval(stmt, &scope)? {
                EvalOutcome::Value(_) => {}
                other => return Ok(other),
            }
        }
        Ok(EvalOutcome::Value(Value::Null))
    }

    fn eval_while(&mut self, cond: &Node, body: &Node, scope: &ScopeRef) -> JayResult<EvalOutcome> {
        while self.eval_value(cond, scope)?.is_truthy() {
            match self.eval(body, scope)? {
                EvalOutcome::Break => break,
                EvalOutcome::Continue | EvalOutcome::Value(_) => {}
                ret @ EvalOutcome::Return(_) => return Ok(ret),
            }
        }
        Ok(EvalOutcome::Value(Value::Null))
    }

    fn eval_counted_for(
        &mut self,
        init: &Option<Box<Node>>,
        cond: &Option<Node>,
        update: &Option<Box<Node>>,
        body: &Node,
        parent: &ScopeRef,
    ) -> JayResult<EvalOutcome> {
        let scope = Scope::new(Some(parent.clone()));
        if let Some(init) = init {
            self.eval_value(init, &scope)?;
        }
        loop {
            if let Some(cond) = cond {
                if !self.eval_value(cond, &scope)?.is_truthy() {
                    break;
                }
            }
            match self.eval(body, &scope)? {
                EvalOutcome::Break => break,
                EvalOutcome::Continue | EvalOutcome::Value(_) => {}
                ret @ EvalOutcome::Return(_) => return Ok(ret),
            }
            if let Some(update) = update {
                self.eval_value(update, &scope)?;
            }
        }
        Ok(EvalOutcome::Value(Value::Null))
    }

    fn eval_range_for(
        &mut self,
        item: &str,
        index: &Option<String>,
        iterable: &Node,
        body: &Node,
        parent: &ScopeRef,
    ) -> JayResult<EvalOutcome> {
        let iter_val = self.eval_value(iterable, parent)?;
        let items: Vec<Value> = match &iter_val {
            Value::Array(a) => a.borrow().clone(),
            Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
            Value::Object(o) | Value::Module(o) => o.borrow().keys().map(|k| Value::str(k.clone())).collect(),
            other => {
                return Err(self.err(0, ErrorKind::Other(format!("cannot iterate over {}", other.type_name()))));
            }
        };
        for (i, v) in items.into_iter().enumerate() {
            let scope = Scope::new(Some(parent.clone()));
            scope::define_local(&scope, item, v, false, 0, &self.current_file)?;
            if let Some(idx_name) = index {
                scope::define_local(&scope, idx_name, Value::Int(i as i64), false, 0, &self.current_file)?;
            }
            match self.eval(body, &scope)? {
                EvalOutcome::Break => break,
                EvalOutcome::Continue | EvalOutcome::Value(_) => {}
                ret @ EvalOutcome::Return(_) => return Ok(ret),
            }
        }
        Ok(EvalOutcome::Value(Value::Null))
    }

    /// An explicit `break` inside a branch only terminates the `case`
    /// itself (matching a C `switch`'s `break`), so [`EvalOutcome::Break`]
    /// is absorbed here rather than left to propagate into any enclosing
    /// loop. `return`/`continue` still propagate normally.
    fn eval_case(&mut self, scrutinee: &Node, branches: &[CaseBranch], scope: &ScopeRef) -> JayResult<EvalOutcome> {
        let subject = self.eval_value(scrutinee, scope)?;
        let mut default_branch: Option<&CaseBranch> = None;
        for branch in branches {
            match &branch.atoms {
                None => default_branch = Some(branch),
                Some(atoms) => {
                    if self.case_matches(&subject, atoms, scope)? {
                        return Ok(Self::absorb_case_break(self.eval_branch_body(&branch.body, scope)?));
                    }
                }
            }
        }
        if let Some(branch) = default_branch {
            return Ok(Self::absorb_case_break(self.eval_branch_body(&branch.body, scope)?));
        }
        Ok(EvalOutcome::Value(Value::Null))
    }

    fn absorb_case_break(outcome: EvalOutcome) -> EvalOutcome {
        match outcome {
            EvalOutcome::Break => EvalOutcome::Value(Value::Null),
            other => other,
        }
    }

    fn case_matches(&mut self, subject: &Value, atoms: &[MatchAtom], scope: &ScopeRef) -> JayResult<bool> {
        for atom in atoms {
            match atom {
                MatchAtom::Value(n) => {
                    let v = self.eval_value(n, scope)?;
                    if subject.loose_eq(&v) {
                        return Ok(true);
                    }
                }
                MatchAtom::Range(lo, hi) => {
                    let lo = self.eval_value(lo, scope)?.to_number();
                    let hi = self.eval_value(hi, scope)?.to_number();
                    let n = subject.to_number();
                    if n >= lo.min(hi) && n <= lo.max(hi) {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn eval_branch_body(&mut self, body: &[Node], parent: &ScopeRef) -> JayResult<EvalOutcome> {
        let scope = Scope::new(Some(parent.clone()));
        for stmt in body {
            match self.eval(stmt, &scope)? {
                EvalOutcome::Value(_) => {}
                other => return Ok(other),
            }
        }
        Ok(EvalOutcome::Value(Value::Null))
    }

    fn eval_new(&mut self, class_name: &str, args: &[Node], scope: &ScopeRef) -> JayResult<EvalOutcome> {
        let class = self
            .classes
            .get(class_name)
            .ok_or_else(|| self.err(0, ErrorKind::UndefinedClass(class_name.to_string())))?;
        let instance = Rc::new(Instance { class: class.clone(), props: Rc::new(RefCell::new(IndexMap::new())) });
        let mut arg_vals = Vec::with_capacity(args.len());
        for a in args {
            arg_vals.push(self.eval_value(a, scope)?);
        }
        if let Some((owner, method)) = self.classes.find_method(&class, "init") {
            self.call_method(&instance, &owner, &method, &arg_vals, 0)?;
        }
        Ok(EvalOutcome::Value(Value::Instance(instance)))
    }

    // ---- operators --------------------------------------------------------

    fn eval_binary(&mut self, op: BinOp, left: &Node, right: &Node, scope: &ScopeRef) -> JayResult<EvalOutcome> {
        if matches!(op, BinOp::And) {
            let l = self.eval_value(left, scope)?;
            if !l.is_truthy() {
                return Ok(EvalOutcome::Value(l));
            }
            return Ok(EvalOutcome::Value(self.eval_value(right, scope)?));
        }
        if matches!(op, BinOp::Or) {
            let l = self.eval_value(left, scope)?;
            if l.is_truthy() {
                return Ok(EvalOutcome::Value(l));
            }
            return Ok(EvalOutcome::Value(self.eval_value(right, scope)?));
        }
        let l = self.eval_value(left, scope)?;
        let r = self.eval_value(right, scope)?;
        Ok(EvalOutcome::Value(self.apply_binop(op, &l, &r)?))
    }

    /// Numeric ops promote to float if either operand is float; `+` on two
    /// strings (or a string and anything else) concatenates, matching the
    /// original's `eval_binop` type-promotion table.
    fn apply_binop(&self, op: BinOp, l: &Value, r: &Value) -> JayResult<Value> {
        use BinOp::*;
        if op == Add {
            if let (Value::Str(_), _) | (_, Value::Str(_)) = (l, r) {
                return Ok(Value::str(format!("{}{}", l.to_display_string(), r.to_display_string())));
            }
        }
        match op {
            Add | Sub | Mul | Div | Mod | Pow => {
                let both_int = matches!(l, Value::Int(_)) && matches!(r, Value::Int(_));
                if both_int && matches!(op, Add | Sub | Mul) {
                    let (a, b) = (int_of(l), int_of(r));
                    let v = match op {
                        Add => a.wrapping_add(b),
                        Sub => a.wrapping_sub(b),
                        Mul => a.wrapping_mul(b),
                        _ => unreachable!(),
                    };
                    return Ok(Value::Int(v));
                }
                let (a, b) = (l.to_number(), r.to_number());
                let v = match op {
                    Add => a + b,
                    Sub => a - b,
                    Mul => a * b,
                    Div => {
                        if b == 0.0 {
                            return Err(JayError::new(self.current_file.clone(), 0, ErrorKind::DivisionByZero));
                        }
                        a / b
                    }
                    Mod => {
                        if b == 0.0 {
                            return Err(JayError::new(self.current_file.clone(), 0, ErrorKind::ModuloByZero));
                        }
                        if both_int {
                            return Ok(Value::Int(int_of(l).wrapping_rem(int_of(r))));
                        }
                        a % b
                    }
    Pow => a.powf(b),
                    _ => unreachable!(),
                };
                // Add/Sub/Mul/Mod on two ints already returned above; whatever
                // reaches here is Div, Pow, or a mixed-type op, which always
                // yields float per spec.
                Ok(Value::Float(v))
            }
            Lt | Gt | Le | Ge => {
                let ordering =
                    l.to_number().partial_cmp(&r.to_number()).unwrap_or(std::cmp::Ordering::Equal);
                let b = match op {
                    Lt => ordering.is_lt(),
                    Gt => ordering.is_gt(),
                    Le => ordering.is_le(),
                    Ge => ordering.is_ge(),
                    _ => unreachable!(),
                };
                Ok(Value::Bool(b))
            }
            EqEq => Ok(Value::Bool(l.loose_eq(r))),
            NotEq => Ok(Value::Bool(!l.loose_eq(r))),
            And | Or => unreachable!("short-circuited above"),
        }
    }

    fn eval_unary(&mut self, op: UnOp, operand: &Node, scope: &ScopeRef) -> JayResult<EvalOutcome> {
        match op {
            UnOp::Neg => {
                let v = self.eval_value(operand, scope)?;
                Ok(EvalOutcome::Value(match v {
                    Value::Int(i) => Value::Int(-i),
                    other => Value::Float(-other.to_number()),
                }))
            }
            UnOp::Plus => {
                let v = self.eval_value(operand, scope)?;
                Ok(EvalOutcome::Value(match v {
                    Value::Int(_) => v,
                    other => Value::Float(other.to_number()),
                }))
            }
            UnOp::Not => {
                let v = self.eval_value(operand, scope)?;
                Ok(EvalOutcome::Value(Value::Bool(!v.is_truthy())))
            }
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                let name = match operand {
                    Node::Variable(n) => n.clone(),
                    _ => return Err(self.err(0, ErrorKind::InvalidAssignmentTarget)),
                };
                let current = scope::lookup(scope, &name).ok_or_else(|| self.err(0, ErrorKind::UndefinedVariable(name.clone())))?;
                if scope::is_const(scope, &name) {
                    return Err(self.err(0, ErrorKind::ConstModify(name.clone())));
                }
                let delta = if matches!(op, UnOp::PreInc | UnOp::PostInc) { 1.0 } else { -1.0 };
                let updated = match &current {
                    Value::Int(i) => Value::Int(i + delta as i64),
                    other => Value::Float(other.to_number() + delta),
                };
                scope::assign_existing(scope, &name, updated.clone(), 0, &self.current_file)?;
                let result = if matches!(op, UnOp::PreInc | UnOp::PreDec) { updated } else { current };
                Ok(EvalOutcome::Value(result))
            }
        }
    }

    // ---- indexing / member access -----------------------------------------

    fn index_get(&mut self, base: &Value, index: &Value) -> JayResult<Value> {
        match base {
            Value::Array(a) => {
                let i = normalize_index(index.to_number() as i64, a.borrow().len());
                Ok(a.borrow().get(i).cloned().unwrap_or(Value::Null))
            }
            Value::Str(s) => {
                let i = normalize_index(index.to_number() as i64, s.chars().count());
                Ok(s.chars().nth(i).map(|c| Value::str(c.to_string())).unwrap_or(Value::Null))
            }
            Value::Object(o) | Value::Module(o) => {
                let key = index.to_display_string();
                Ok(o.borrow().get(&key).cloned().unwrap_or(Value::Null))
            }
            other => Err(self.err(0, ErrorKind::Other(format!("cannot index into {}", other.type_name())))),
        }
    }

    fn index_assign(&mut self, base: &Value, index: &Value, value: Value) -> JayResult<()> {
        match base {
            Value::Array(a) => {
                let want = index.to_number() as i64;
                let len = a.borrow().len();
                let i = normalize_index(want, len);
                let mut b = a.borrow_mut();
                if i < b.len() {
                    b[i] = value;
                }
                Ok(())
            }
            Value::Object(o) | Value::Module(o) => {
                o.borrow_mut().insert(index.to_display_string(), value);
                Ok(())
            }
            other => Err(self.err(0, ErrorKind::Other(format!("cannot index-assign into {}", other.type_name())))),
        }
    }

    fn member_get(&mut self, base: &Value, name: &str) -> JayResult<Value> {
        match base {
            Value::Object(o) | Value::Module(o) => Ok(o.borrow().get(name).cloned().unwrap_or(Value::Null)),
            Value::Instance(inst) => {
                if let Some(v) = inst.props.borrow().get(name) {
                    return Ok(v.clone());
                }
                if self.classes.find_method(&inst.class, name).is_some() {
                    return Ok(Value::str(format!("<bound method {}>", name)));
                }
                Ok(Value::Null)
            }
            Value::Array(_) | Value::Str(_) => builtins_dispatch::array_or_string_property(base, name),
            other => Err(self.err(0, ErrorKind::Other(format!("cannot access member of {}", other.type_name())))),
        }
    }

    fn member_assign(&mut self, base: &Value, name: &str, value: Value) -> JayResult<()> {
        match base {
            Value::Object(o) | Value::Module(o) => {
                o.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            Value::Instance(inst) => {
                inst.props.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            other => Err(self.err(0, ErrorKind::Other(format!("cannot set member on {}", other.type_name())))),
        }
    }

    // ---- calls --------------------------------------------------------------

    fn eval_call(&mut self, callee: &Node, args: &[Node], scope: &ScopeRef) -> JayResult<EvalOutcome> {
        let mut arg_vals = Vec::with_capacity(args.len());
        for a in args {
            arg_vals.push(self.eval_value(a, scope)?);
        }

        // `print(...)` and other builtins are special-cased ahead of the
        // user function table, matching `call_func`'s dispatch order in the
        // original (builtin name collisions always resolve to the builtin).
        if let Node::Variable(name) = callee {
            if builtins_dispatch::is_builtin(name) {
                return Ok(EvalOutcome::Value(builtins_dispatch::call(self, name, &arg_vals, scope)?));
            }
            if let Some(def) = self.functions.get(name).cloned() {
                return Ok(EvalOutcome::Value(self.call_function(&def, &arg_vals, 0)?));
            }
        }

        // Method call: `expr.method(args)`.
        if let Node::Member { base, name } = callee {
            let base_val = self.eval_value(base, scope)?;
            if let Value::Instance(inst) = &base_val {
                if let Some((owner, method)) = self.classes.find_method(&inst.class, name) {
                    return Ok(EvalOutcome::Value(self.call_method(inst, &owner, &method, &arg_vals, 0)?));
                }
            }
            if matches!(base.as_ref(), Node::Super) {
                if let (Some(inst), Some(class)) = (self.current_self.clone(), self.current_class.clone()) {
                    if let Some(parent_name) = &class.parent {
                        if let Some(parent) = self.classes.get(parent_name) {
                            if let Some((owner, method)) = self.classes.find_method(&parent, name) {
                                return Ok(EvalOutcome::Value(self.call_method(&inst, &owner, &method, &arg_vals, 0)?));
                            }
                        }
                    }
                }
            }
            match builtins_dispatch::call_method_builtin(self, &base_val, name, &arg_vals) {
                Ok(v) => return Ok(EvalOutcome::Value(v)),
                // No built-in method by that name: fall back to reading the
                // member as a value and invoking it as a callable, matching
                // jeem.c's AST_CALL falling through to call_func/call_closure
                // when call_method returns null for an object/module/instance.
                Err(e) if matches!(e.kind, ErrorKind::UndefinedFunction(_))
                    && matches!(
                        &base_val,
                        Value::Object(_) | Value::Module(_) | Value::Instance(_) | Value::Array(_) | Value::Str(_)
                    ) =>
                {
                    if let callable @ (Value::Closure(_) | Value::FunctionRef(_)) = self.member_get(&base_val, name)? {
                        return Ok(EvalOutcome::Value(self.call_value(&callable, &arg_vals, scope, 0)?));
                    }
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }

        let callee_val = self.eval_value(callee, scope)?;
        Ok(EvalOutcome::Value(self.call_value(&callee_val, &arg_vals, scope, 0)?))
    }

    pub fn call_value(&mut self, callee: &Value, args: &[Value], scope: &ScopeRef, line: usize) -> JayResult<Value> {
        match callee {
            Value::Closure(c) => self.call_closure(c, args, line),
            Value::FunctionRef(name) => {
                let def = self
                    .functions
                    .get(name.as_str())
                    .cloned()
                    .ok_or_else(|| self.err(line, ErrorKind::UndefinedFunction(name.to_string())))?;
                self.call_function(&def, args, line)
            }
            Value::ClassRef(name) => {
                let class = self
                    .classes
                    .get(name.as_str())
                    .ok_or_else(|| self.err(line, ErrorKind::UndefinedClass(name.to_string())))?;
                let instance = Rc::new(Instance { class: class.clone(), props: Rc::new(RefCell::new(IndexMap::new())) });
                if let Some((owner, method)) = self.classes.find_method(&class, "init") {
                    self.call_method(&instance, &owner, &method, args, line)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => {
                let _ = scope;
                Err(self.err(line, ErrorKind::NotAFunction(callee.type_name().to_string())))
            }
        }
    }

    pub fn call_function(&mut self, def: &Rc<FunctionDef>, args: &[Value], line: usize) -> JayResult<Value> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(self.err(line, ErrorKind::StackOverflow));
        }
        let frame = Scope::new(Some(self.global.clone()));
        bind_params(&frame, &def.params, args, &self.current_file)?;
        let saved_self = self.current_self.take();
        let saved_class = self.current_class.take();
        let result = self.run_body(&def.body, &frame);
        self.current_self = saved_self;
        self.current_class = saved_class;
        self.depth -= 1;
        result
    }

    fn call_closure(&mut self, closure: &Rc<Closure>, args: &[Value], line: usize) -> JayResult<Value> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(self.err(line, ErrorKind::StackOverflow));
        }
        let frame = Scope::new(Some(self.global.clone()));
        for (name, value) in closure.captured.iter() {
            scope::define_local(&frame, name, value.clone(), false, line, &self.current_file)?;
        }
        bind_params(&frame, &closure.params, args, &self.current_file)?;
        let result = self.run_body(&closure.body, &frame);
        self.depth -= 1;
        result
    }

    pub fn call_method(
        &mut self,
        instance: &Rc<Instance>,
        owner: &Rc<ClassDef>,
        method: &Method,
        args: &[Value],
        line: usize,
    ) -> JayResult<Value> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(self.err(line, ErrorKind::StackOverflow));
        }
        let frame = Scope::new(Some(self.global.clone()));
        bind_params(&frame, &method.params, args, &self.current_file)?;
        let saved_self = self.current_self.replace(instance.clone());
        let saved_class = self.current_class.replace(owner.clone());
        let result = self.run_body(&method.body, &frame);
        self.current_self = saved_self;
        self.current_class = saved_class;
        self.depth -= 1;
        result
    }

    fn run_body(&mut self, body: &Rc<Vec<Node>>, frame: &ScopeRef) -> JayResult<Value> {
        for stmt in body.iter() {
            match self.eval(stmt, frame)? {
                EvalOutcome::Return(v) => return Ok(v),
                EvalOutcome::Value(_) => {}
                EvalOutcome::Break | EvalOutcome::Continue => {
                    return Err(self.err(0, ErrorKind::Other("break/continue outside loop".to_string())));
                }
            }
        }
        Ok(Value::Null)
    }
}

fn bind_params(frame: &ScopeRef, params: &[String], args: &[Value], file: &str) -> JayResult<()> {
    for (i, p) in params.iter().enumerate() {
        let v = args.get(i).cloned().unwrap_or(Value::Null);
        scope::define_local(frame, p, v, false, 0, file)?;
    }
    Ok(())
}

fn int_of(v: &Value) -> i64 {
    match v {
        Value::Int(i) => *i,
        other => other.to_number() as i64,
    }
}

/// Negative indices count from the end, matching the original's array
/// accessor helper; out-of-range reads return an index one past the end so
/// callers see `Null`/default behavior instead of panicking.
fn normalize_index(i: i64, len: usize) -> usize {
    if i < 0 {
        let from_end = (-i) as usize;
        if from_end > len {
            len
        } else {
            len - from_end
        }
    } else {
        i as usize
    }
}

fn apply_compound(current: &Value, op: CompoundOp, rhs: &Value, interp: &Interpreter) -> JayResult<Value> {
    let bin = match op {
        CompoundOp::Add => BinOp::Add,
        CompoundOp::Sub => BinOp::Sub,
        CompoundOp::Mul => BinOp::Mul,
        CompoundOp::Div => BinOp::Div,
        CompoundOp::Mod => BinOp::Mod,
    };
    interp.apply_binop(bin, current, rhs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parses and runs `src` top to bottom, returning the value of its last
    /// top-level statement (handy for asserting on computed results without
    /// needing to capture stdout from `print`).
    fn run_last(src: &str) -> Value {
        let program = crate::parser::parse(src, "<test>").unwrap();
        let mut interp = Interpreter::new("<test>");
        interp.hoist(&program).unwrap();
        let scope = interp.global.clone();
        let mut last = Value::Null;
        for stmt in &program {
            if matches!(stmt, Node::Function { name: Some(_), .. } | Node::Class { .. }) {
                continue;
            }
            last = interp.eval(stmt, &scope).unwrap().into_value();
        }
        last
    }

    fn run_err(src: &str) -> ErrorKind {
        let program = crate::parser::parse(src, "<test>").unwrap();
        let mut interp = Interpreter::new("<test>");
        interp.run_program(&program).unwrap_err().kind
    }

    #[test]
    fn arithmetic_precedence_and_int_narrowing() {
        let v = run_last("const x = 5 + 3 * 2; x;");
        assert!(matches!(v, Value::Int(11)));
    }

    #[test]
    fn division_always_yields_float() {
        assert!(matches!(run_last("10 / 4;"), Value::Float(f) if (f - 2.5).abs() < 1e-9));
        assert!(matches!(run_last("10 / 5;"), Value::Float(f) if (f - 2.0).abs() < 1e-9));
    }

    #[test]
    fn string_concatenation_via_plus() {
        let v = run_last(r#""foo" + "bar";"#);
        assert_eq!(v.to_display_string(), "foobar");
    }

    #[test]
    fn scope_shadowing_in_nested_block() {
        let v = run_last(
            r#"
            const x = 1;
            let result = 0;
            {
                const x = 2;
                result = x;
            }
            result;
            "#,
        );
        assert!(matches!(v, Value::Int(2)));
    }

    #[test]
    fn assignment_updates_nearest_enclosing_non_global_scope() {
        let v = run_last(
            r#"
            func counter() {
                let n = 0;
                func bump() {
                    n = n + 1;
                    return n;
                }
                bump();
                bump();
                return bump();
            }
            counter();
            "#,
        );
        assert!(matches!(v, Value::Int(3)));
    }

    #[test]
    fn const_reassignment_is_rejected() {
        assert!(matches!(run_err("const x = 1; x = 2;"), ErrorKind::ConstReassign(n) if n == "x"));
    }

    #[test]
    fn const_increment_is_rejected() {
        assert!(matches!(run_err("const x = 1; x++;"), ErrorKind::ConstModify(n) if n == "x"));
    }

    #[test]
    fn range_for_accumulates_in_order() {
        let v = run_last(
            r#"
            let out = [];
            for (i in range(3)) { out.push(i); }
            out;
            "#,
        );
        match v {
            Value::Array(a) => {
                let items = a.borrow();
                assert_eq!(items.len(), 3);
                assert!(matches!(items[0], Value::Int(0)));
                assert!(matches!(items[2], Value::Int(2)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn counted_for_respects_break_and_continue() {
        let v = run_last(
            r#"
            let sum = 0;
            for (i = 0; i < 10; i += 1) {
                if (i == 5) { break; }
                if (i % 2 == 0) { continue; }
                sum += i;
            }
            sum;
            "#,
        );
        // odd numbers below 5: 1 + 3 = 4
        assert!(matches!(v, Value::Int(4)));
    }

    #[test]
    fn arrow_closure_captures_by_name_at_creation_time() {
        let v = run_last(
            r#"
            func makeAdder(n) {
                return x => x + n;
            }
            const addFive = makeAdder(5);
            addFive(10);
            "#,
        );
        assert!(matches!(v, Value::Int(15)));
    }

    #[test]
    fn class_instance_and_method_dispatch() {
        let v = run_last(
            r#"
            class Animal {
                init(name) { this.name = name; }
                speak() { return this.name + " makes a sound"; }
            }
            class Dog extends Animal {
                speak() { return this.name + " barks"; }
            }
            const d = new Dog("Rex");
            d.speak();
            "#,
        );
        assert_eq!(v.to_display_string(), "Rex barks");
    }

    #[test]
    fn super_call_reaches_parent_method() {
        let v = run_last(
            r#"
            class Animal {
                speak() { return "generic sound"; }
            }
            class Dog extends Animal {
                speak() { return super.speak() + " then bark"; }
            }
            const d = new Dog();
            d.speak();
            "#,
        );
        assert_eq!(v.to_display_string(), "generic sound then bark");
    }

    #[test]
    fn case_statement_matches_value_and_range_atoms() {
        let v = run_last(
            r#"
            func classify(n) {
                case (n) {
                    1, 2: return "low";
                    3..5: return "mid";
                    default: return "other";
                }
            }
            [classify(1), classify(4), classify(9)];
            "#,
        );
        match v {
            Value::Array(a) => {
                let items = a.borrow();
                assert_eq!(items[0].to_display_string(), "low");
                assert_eq!(items[1].to_display_string(), "mid");
                assert_eq!(items[2].to_display_string(), "other");
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn template_interpolation_reevaluates_raw_expression() {
        let v = run_last(r#"const name = "jay"; const n = 2 + 3; "hi {{ name }}, {{ n }}!";"#);
        assert_eq!(v.to_display_string(), "hi jay, 5!");
    }

    #[test]
    fn negative_array_index_counts_from_end() {
        let v = run_last("const a = [1, 2, 3]; a[-1];");
        assert!(matches!(v, Value::Int(3)));
    }

    #[test]
    fn set_timeout_does_not_fire_before_the_queue_is_drained() {
        let v = run_last(
            r#"
            let out = [];
            setTimeout(func() { out.push("second"); }, 10);
            setTimeout(func() { out.push("first"); }, 1);
            out;
            "#,
        );
        // Timers drain only after `run_program`'s main body; at this point in
        // a bare `run_last` (which doesn't drain) the array is still empty.
        match v {
            Value::Array(a) => assert!(a.borrow().is_empty()),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn drain_timers_runs_due_callbacks_in_fire_order() {
        let program = crate::parser::parse(
            r#"
            let out = [];
            setTimeout(func() { out.push("second"); }, 10);
            setTimeout(func() { out.push("first"); }, 1);
            "#,
            "<test>",
        )
        .unwrap();
        let mut interp = Interpreter::new("<test>");
        interp.run_program(&program).unwrap();
        let out = scope::lookup(&interp.global, "out").unwrap();
        match out {
            Value::Array(a) => {
                let items = a.borrow();
                assert_eq!(items[0].to_display_string(), "first");
                assert_eq!(items[1].to_display_string(), "second");
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn undefined_variable_errors_with_name() {
        assert!(matches!(run_err("print(doesNotExist);"), ErrorKind::UndefinedVariable(n) if n == "doesNotExist"));
    }

    #[test]
    fn calling_a_non_callable_value_errors() {
        assert!(matches!(run_err("const x = 1; x();"), ErrorKind::NotAFunction(t) if t == "int"));
    }
}
