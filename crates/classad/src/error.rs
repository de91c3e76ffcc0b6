//! Errors raised by misuse of records, stores and collections.

use classad_parser::ParseError;
use thiserror::Error;

use crate::store::RecordId;

/// Errors from record, store and collection operations.
///
/// Evaluation problems never show up here; they are carried as
/// [`Value`](crate::Value)s.
#[derive(Debug, Error)]
pub enum ClassAdError {
    /// Source text did not parse.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Only `name = expr` can be stored in a record.
    #[error("expression is not an assignment of the form 'name = expr'")]
    NotAssignment,

    /// The handle refers to a record that has been destroyed.
    #[error("record {0} no longer exists")]
    DanglingRecord(RecordId),

    /// The record is still held by one or more collections.
    #[error("record {id} is still a member of {memberships} collection(s)")]
    StillMember { id: RecordId, memberships: usize },

    /// A record cannot be chained to itself.
    #[error("record {0} cannot be chained to itself")]
    SelfChain(RecordId),
}

/// Errors from reading records out of text.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line of the record did not parse. The rest of the record, up to
    /// the next delimiter, was skipped.
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    /// A line parsed as an expression but not as `name = expr`.
    #[error("line {line}: expected an assignment of the form 'name = expr'")]
    NotAssignment { line: usize },
}
