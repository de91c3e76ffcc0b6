//! Runtime values for ClassAd evaluation.

use std::fmt;
use std::sync::Arc;

use classad_parser::Literal;

use super::EvalError;
use crate::unparser::{escape_string, format_float};

/// A ClassAd runtime value.
///
/// Evaluation never fails: problems are carried as `Undefined`, `Error`
/// or `Null` and propagate through the surrounding expression.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    /// Unicode string (Arc for cheap cloning).
    String(Arc<str>),
    Bool(bool),
    Undefined,
    /// Error value, with the reason it was produced.
    Error(Arc<EvalError>),
    Null,
}

impl Value {
    /// Create an error value.
    pub fn error(err: EvalError) -> Self {
        Value::Error(Arc::new(err))
    }

    /// Convert a literal from the expression tree.
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(Arc::from(s.as_str())),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Undefined => Value::Undefined,
            Literal::Error => Value::error(EvalError::literal()),
            Literal::Null => Value::Null,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Name of this value's type as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Undefined => "undefined",
            Value::Error(_) => "error",
            Value::Null => "null",
        }
    }

    // === Accessors ===

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Float value, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truth value of a boolean or numeric value; non-zero numbers are true.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(n) => Some(*n != 0),
            Value::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    /// Same type and same value: the `=?=` relation.
    ///
    /// Strings compare case-sensitively and `UNDEFINED` is identical to
    /// itself. Integers and floats are never identical to each other.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Undefined, Value::Undefined)
            | (Value::Error(_), Value::Error(_))
            | (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

// ==================== Equality ====================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // The reason is diagnostic only.
            (Value::Error(_), Value::Error(_)) => true,
            _ => self.is_identical(other),
        }
    }
}

// ==================== Conversions ====================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<EvalError> for Value {
    fn from(err: EvalError) -> Self {
        Value::error(err)
    }
}

// ==================== Display ====================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
            Value::Undefined => write!(f, "UNDEFINED"),
            Value::Error(_) => write!(f, "ERROR"),
            Value::Null => write!(f, "NULL"),
        }
    }
}
