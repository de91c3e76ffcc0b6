//! Attribute resolution for evaluation.
//!
//! A `Scope` maps attribute names to the right-hand sides of their
//! assignments. Records, chained records held in an [`AdStore`](crate::AdStore)
//! and collections all implement it, so one evaluator serves every context.

use classad_parser::{Expr, Literal};

use super::EvalError;

/// Trait for resolving attribute names during evaluation.
pub trait Scope {
    /// Resolve `name` (case-insensitively) to the right-hand side of its
    /// assignment.
    ///
    /// Returns `Ok(None)` if the name is not defined here, and an error if
    /// the lookup had to follow a handle to a record that no longer exists.
    fn lookup(&self, name: &str) -> Result<Option<&Expr>, EvalError>;

    /// Check if an attribute is defined.
    fn has(&self, name: &str) -> bool {
        matches!(self.lookup(name), Ok(Some(_)))
    }

    // === Typed Lookups ===
    //
    // These inspect the literal right-hand side without evaluating it.

    /// String literal value of `name`.
    fn lookup_string(&self, name: &str) -> Option<String> {
        match literal_of(self, name)? {
            Literal::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Integer literal value of `name`; boolean literals read as 0 or 1.
    fn lookup_integer(&self, name: &str) -> Option<i64> {
        match literal_of(self, name)? {
            Literal::Integer(n) => Some(*n),
            Literal::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Float literal value of `name`; integer literals are widened.
    fn lookup_float(&self, name: &str) -> Option<f64> {
        match literal_of(self, name)? {
            Literal::Float(f) => Some(*f),
            Literal::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Boolean literal value of `name`; integer literals are true when non-zero.
    fn lookup_bool(&self, name: &str) -> Option<bool> {
        match literal_of(self, name)? {
            Literal::Bool(b) => Some(*b),
            Literal::Integer(n) => Some(*n != 0),
            _ => None,
        }
    }
}

fn literal_of<'s, S: Scope + ?Sized>(scope: &'s S, name: &str) -> Option<&'s Literal> {
    scope.lookup(name).ok().flatten()?.as_literal()
}

/// A scope with no attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _name: &str) -> Result<Option<&Expr>, EvalError> {
        Ok(None)
    }
}
