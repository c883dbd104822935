//! Free-variable collection for arrow/anonymous-function capture.
//!
//! Rather than deep-cloning the whole scope chain at creation time (what the
//! original's `deep_copy_scope` did), we snapshot only the names a closure
//! body actually mentions, then takes a read-only value snapshot of those.
//! Over-collecting (e.g. a name that's actually shadowed by a nested
//! function's own parameter) is harmless: `scope::snapshot_names` just skips
//! names that aren't bound when the closure is created.

use std::collections::HashSet;

use crate::ast::{MatchAtom, Node};

pub fn collect(body: &[Node], params: &[String]) -> HashSet<String> {
    let mut names = HashSet::new();
    for stmt in body {
        walk(stmt, &mut names);
    }
    for p in params {
        names.remove(p);
    }
    names
}

fn walk(node: &Node, out: &mut HashSet<String>) {
    match node {
        Node::Literal(_) | Node::Break | Node::Continue | Node::This | Node::Super => {}
        Node::Template(_) => {
            // Interpolated expressions are re-parsed at evaluation time from
            // raw source, so we conservatively don't try to free-var them;
            // evaluation falls back to global/module lookups for names they
            // reference that weren't otherwise captured.
        }
        Node::Array(items) => items.iter().for_each(|n| walk(n, out)),
        Node::Object(items) => items.iter().for_each(|(_, n)| walk(n, out)),
        Node::Variable(name) => {
            out.insert(name.clone());
        }
        Node::Assign { value, .. } => walk(value, out),
        Node::IndexAssign { target, value } | Node::MemberAssign { target, value } => {
            walk(target, out);
            walk(value, out);
        }
        Node::Binary { left, right, .. } => {
            walk(left, out);
            walk(right, out);
        }
        Node::Unary { operand, .. } => walk(operand, out),
        Node::Ternary { cond, then_branch, else_branch } => {
            walk(cond, out);
            walk(then_branch, out);
            walk(else_branch, out);
        }
        Node::Index { base, index } => {
            walk(base, out);
            walk(index, out);
        }
        Node::Member { base, .. } => walk(base, out),
        Node::Call { callee, args } => {
            walk(callee, out);
            args.iter().for_each(|n| walk(n, out));
        }
        Node::Block(stmts) => stmts.iter().for_each(|n| walk(n, out)),
        Node::If { cond, then_branch, else_branch } => {
            walk(cond, out);
            walk(then_branch, out);
            if let Some(e) = else_branch {
                walk(e, out);
            }
        }
        Node::While { cond, body } => {
            walk(cond, out);
            walk(body, out);
        }
        Node::RangeFor { iterable, body, .. } => {
            walk(iterable, out);
            walk(body, out);
        }
        Node::CountedFor { init, cond, update, body } => {
            if let Some(n) = init {
                walk(n, out);
            }
            if let Some(n) = cond {
                walk(n, out);
            }
            if let Some(n) = update {
                walk(n, out);
            }
            walk(body, out);
        }
        Node::Case { scrutinee, branches } => {
            walk(scrutinee, out);
            for b in branches {
                if let Some(atoms) = &b.atoms {
                    for a in atoms {
                        match a {
                            MatchAtom::Value(n) => walk(n, out),
                            MatchAtom::Range(lo, hi) => {
                                walk(lo, out);
                                walk(hi, out);
                            }
                        }
                    }
                }
                b.body.iter().for_each(|n| walk(n, out));
            }
        }
        Node::Return(value) => {
            if let Some(v) = value {
                walk(v, out);
            }
        }
        Node::Function { body, params, .. } | Node::Arrow { body, params } => {
            let inner = collect(body, params);
            out.extend(inner);
        }
        Node::Class { .. } => {}
        Node::New { args, .. } => args.iter().for_each(|n| walk(n, out)),
        Node::Import { .. } => {}
        Node::CompoundAssign { name, value, .. } => {
            out.insert(name.clone());
            walk(value, out);
        }
        Node::ExprStatement(e) => walk(e, out),
    }
}
