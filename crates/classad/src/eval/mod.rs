//! ClassAd evaluation engine.
//!
//! - `Value` represents runtime values
//! - `Scope` resolves attribute names to expressions
//! - `Evaluator` performs tree-walking evaluation in a single scope or a
//!   `(mine, target)` pair
//!
//! # Example
//!
//! ```
//! use classad::{Record, Value};
//! use classad::eval::Evaluator;
//!
//! let record = Record::parse("Memory = 64\nDisk = Memory * 2").unwrap();
//! let value = Evaluator::new(&record).eval_attribute("Disk");
//! assert_eq!(value, Value::Integer(128));
//! ```

mod error;
mod evaluator;
mod scope;
mod typed;
mod value;

pub use error::{EvalError, EvalErrorKind};
pub use evaluator::Evaluator;
pub use scope::{EmptyScope, Scope};
pub use typed::{eval_attribute, eval_bool, eval_bool_opt, eval_float, eval_integer, eval_string};
pub use value::Value;
