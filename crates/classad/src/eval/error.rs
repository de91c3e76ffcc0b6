//! Evaluation error types.

use std::fmt;

/// The reason an expression evaluated to `ERROR`.
#[derive(Debug, Clone)]
pub struct EvalError {
    /// The error message.
    pub message: String,
    /// The kind of error.
    pub kind: EvalErrorKind,
}

/// The kind of evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// The expression contains the literal `ERROR`.
    Literal,
    /// An attribute refers back to itself while being evaluated.
    Circular,
    /// An unscoped attribute name was used where `MY.` or `TARGET.` is required.
    UnscopedName,
    /// Integer division by zero.
    DivisionByZero,
    /// Integer overflow.
    Overflow,
    /// A record handle no longer refers to a live record.
    DanglingRecord,
    /// A chained record was evaluated on its own, without the store
    /// holding its parent.
    DetachedChain,
    /// Attribute resolution nested deeper than the configured limit.
    DepthExceeded,
}

impl EvalError {
    /// Create a new error with the given kind and message.
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn literal() -> Self {
        Self::new(EvalErrorKind::Literal, "ERROR literal")
    }

    pub fn circular(name: &str) -> Self {
        Self::new(
            EvalErrorKind::Circular,
            format!("circular reference while evaluating {}", name),
        )
    }

    pub fn unscoped_name(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnscopedName,
            format!("attribute {} must be scoped with MY. or TARGET.", name),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "division by zero")
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Overflow, message)
    }

    pub fn dangling_record(handle: impl fmt::Display) -> Self {
        Self::new(
            EvalErrorKind::DanglingRecord,
            format!("record {} no longer exists", handle),
        )
    }

    pub fn detached_chain(parent: impl fmt::Display) -> Self {
        Self::new(
            EvalErrorKind::DetachedChain,
            format!("record is chained to {} but was evaluated outside its store", parent),
        )
    }

    pub fn depth_exceeded(limit: usize) -> Self {
        Self::new(
            EvalErrorKind::DepthExceeded,
            format!("attribute references nested deeper than {}", limit),
        )
    }

    pub fn nesting_exceeded(limit: usize) -> Self {
        Self::new(
            EvalErrorKind::DepthExceeded,
            format!("expression nested deeper than {} nodes", limit),
        )
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}
