//! ClassAd: records of named expressions, their evaluation and matchmaking.
//!
//! A ClassAd is a record of `name = expression` attributes describing a job
//! or a machine. Expressions refer to attributes by name and are evaluated
//! lazily against one record, a collection of records, or a
//! `(mine, target)` pair when two records are matched against each other.
//!
//! # Quick Start
//!
//! ```
//! use classad::{Record, Value};
//! use classad::eval::Evaluator;
//!
//! let machine = Record::parse("Memory = 2048\nFree = Memory - 512").unwrap();
//! let free = Evaluator::new(&machine).eval_attribute("Free");
//! assert_eq!(free, Value::Integer(1536));
//! ```
//!
//! # Modules
//!
//! - `eval`: values, scopes, the evaluator and typed evaluation helpers
//! - `record`: the `Record` type with dirty flags and type tags
//! - `store`: the `AdStore` arena, chaining and chain-aware views
//! - `collection`: collections with multi-membership and aggregates
//! - `matcher`: the bidirectional match predicate
//! - `reader`: reading records from delimited text
//! - `unparser`: printing expressions back to source text
//!
//! Parsing lives in the `classad-parser` crate; its types are re-exported
//! here.

mod error;
mod registry;

pub mod collection;
pub mod eval;
pub mod matcher;
pub mod options;
pub mod reader;
pub mod record;
pub mod references;
pub mod store;
pub mod unparser;

pub use collection::{Collection, CollectionView, Cursor};
pub use error::{ClassAdError, ReadError};
pub use matcher::{is_half_match, is_match, Ad, Matcher};
pub use options::{EvalOptions, MatchOptions, ReaderOptions};
pub use reader::AdReader;
pub use record::{Attribute, Attributes, Names, Record, TypeTag, Values, ATTR_MY_TYPE, ATTR_TARGET_TYPE};
pub use references::{external_references, internal_references, references, Reference};
pub use registry::{TypeRegistry, ANY_TYPE};
pub use store::{AdRef, AdStore, RecordId};
pub use unparser::expr_to_string;

// Re-export from eval module
pub use eval::{
    eval_bool, eval_float, eval_integer, eval_string, EmptyScope, EvalError, EvalErrorKind,
    Evaluator, Scope, Value,
};

// Re-export from the parser crate
pub use classad_parser::{
    parse, parse_assignment, parse_expr, AggregateOp, BinaryOp, Expr, Literal, ParseError,
    ParseResult, Span, Unit, MAX_NESTING, MAX_TREE_DEPTH,
};
