//! Tree-walking evaluator for ClassAd expressions.
//!
//! The evaluator performs depth-first traversal of the tree, evaluating
//! each node and returning a `Value`. Attribute references are resolved
//! against one scope, or against a `(mine, target)` pair when matching:
//!
//! - With a single scope, `Name` and `MY.Name` look up `Name` in it;
//!   `TARGET.Name` is `UNDEFINED`.
//! - With a pair, names must carry a `MY.` or `TARGET.` prefix. A
//!   `TARGET.` reference is evaluated with the pair swapped, so the
//!   target's own `MY.` references stay inside the target.
//!
//! Both operands of every operator are evaluated, including `&&` and `||`.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use classad_parser::{AggregateOp, BinaryOp, Expr, Unit};
use rustc_hash::FxHashSet;
use tracing::trace;

use super::{EvalError, Scope, Value};
use crate::options::EvalOptions;

const KILO: i64 = 1024;

/// The scopes visible while evaluating one node.
#[derive(Clone, Copy)]
struct Frame<'s> {
    mine: Option<&'s dyn Scope>,
    target: Option<&'s dyn Scope>,
}

impl<'s> Frame<'s> {
    fn swapped(self) -> Self {
        Frame {
            mine: self.target,
            target: self.mine,
        }
    }
}

/// The ClassAd expression evaluator.
pub struct Evaluator<'a> {
    mine: &'a dyn Scope,
    target: Option<&'a dyn Scope>,
    options: EvalOptions,
    /// Addresses of the attribute expressions currently being evaluated.
    active: RefCell<FxHashSet<usize>>,
    depth: Cell<usize>,
    /// Expression nodes currently open on the stack.
    nesting: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator resolving names in a single scope (a record or
    /// a collection).
    pub fn new(scope: &'a dyn Scope) -> Self {
        Self {
            mine: scope,
            target: None,
            options: EvalOptions::default(),
            active: RefCell::new(FxHashSet::default()),
            depth: Cell::new(0),
            nesting: Cell::new(0),
        }
    }

    /// Create an evaluator for the paired `(mine, target)` context.
    pub fn paired(mine: &'a dyn Scope, target: &'a dyn Scope) -> Self {
        Self {
            target: Some(target),
            ..Self::new(mine)
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluate an expression.
    pub fn eval(&self, expr: &Expr) -> Value {
        let frame = Frame {
            mine: Some(self.mine),
            target: self.target,
        };
        self.eval_expr(expr, frame)
    }

    /// Look up `name` the way a variable reference would and evaluate it.
    pub fn eval_attribute(&self, name: &str) -> Value {
        self.eval(&Expr::variable(name))
    }

    fn paired_mode(&self) -> bool {
        self.target.is_some()
    }

    fn eval_expr(&self, expr: &Expr, frame: Frame<'_>) -> Value {
        let nesting = self.nesting.get();
        if nesting >= self.options.max_nesting {
            trace!(limit = self.options.max_nesting, "expression nested too deeply");
            return Value::error(EvalError::nesting_exceeded(self.options.max_nesting));
        }
        self.nesting.set(nesting + 1);

        let value = match expr {
            Expr::Literal { value, unit } => scale(Value::from_literal(value), *unit),
            Expr::Variable(name) => self.eval_variable(name, frame, false),
            Expr::Binary {
                op,
                left,
                right,
                unit,
            } => self.eval_binary(*op, left, right, *unit, frame),
            Expr::Aggregate { op, .. } => self.eval_aggregate(*op, expr, frame),
        };

        self.nesting.set(nesting);
        value
    }

    // === Variables ===

    fn eval_variable(&self, name: &str, frame: Frame<'_>, scoped: bool) -> Value {
        if let Some((prefix, rest)) = name.split_once('.') {
            if prefix.eq_ignore_ascii_case("MY") {
                return self.eval_variable(rest, frame, true);
            }
            if prefix.eq_ignore_ascii_case("TARGET") {
                return self.eval_variable(rest, frame.swapped(), true);
            }
            return Value::Undefined;
        }

        if self.paired_mode() && !scoped {
            return Value::error(EvalError::unscoped_name(name));
        }

        self.resolve(name, frame)
    }

    fn resolve(&self, name: &str, frame: Frame<'_>) -> Value {
        let Some(scope) = frame.mine else {
            return Value::Undefined;
        };

        let rhs = match scope.lookup(name) {
            Ok(Some(rhs)) => rhs,
            Ok(None) => return Value::Undefined,
            Err(err) => return Value::error(err),
        };

        let key = rhs as *const Expr as usize;
        if !self.active.borrow_mut().insert(key) {
            trace!(attribute = name, "circular attribute reference");
            return Value::error(EvalError::circular(name));
        }

        let depth = self.depth.get();
        let result = if depth >= self.options.max_depth {
            Value::error(EvalError::depth_exceeded(self.options.max_depth))
        } else {
            self.depth.set(depth + 1);
            let value = self.eval_expr(rhs, frame);
            self.depth.set(depth);
            value
        };

        self.active.borrow_mut().remove(&key);
        result
    }

    // === Binary Operators ===

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        unit: Unit,
        frame: Frame<'_>,
    ) -> Value {
        if op == BinaryOp::Assign {
            return self.eval_expr(right, frame);
        }

        let left_val = self.eval_expr(left, frame);
        let right_val = self.eval_expr(right, frame);

        if left_val.is_null() || right_val.is_null() {
            return Value::Null;
        }
        if left_val.is_error() {
            return left_val;
        }
        if right_val.is_error() {
            return right_val;
        }

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mult | BinaryOp::Div => {
                scale(eval_arithmetic(op, &left_val, &right_val), unit)
            }
            BinaryOp::MetaEq => Value::Bool(left_val.is_identical(&right_val)),
            BinaryOp::MetaNeq => Value::Bool(!left_val.is_identical(&right_val)),
            BinaryOp::Eq
            | BinaryOp::Neq
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Lt
            | BinaryOp::Le => eval_comparison(op, &left_val, &right_val),
            BinaryOp::And | BinaryOp::Or => eval_logical(op, &left_val, &right_val),
            BinaryOp::Assign => unreachable!("handled above"),
        }
    }

    // === Aggregates ===

    fn eval_aggregate(&self, op: AggregateOp, expr: &Expr, frame: Frame<'_>) -> Value {
        let mut terms = Vec::new();
        collect_terms(op, expr, &mut terms);

        let values: Vec<Value> = terms
            .into_iter()
            .map(|term| self.eval_expr(term, frame))
            .collect();

        if values.iter().any(Value::is_null) {
            return Value::Null;
        }
        if let Some(err) = values.iter().find(|v| v.is_error()) {
            return err.clone();
        }

        match op {
            AggregateOp::AggAdd => sum_values(&values),
            AggregateOp::AggEq => agree_values(values),
        }
    }
}

/// Flatten a left-associated chain of aggregate nodes of the same kind.
fn collect_terms<'e>(op: AggregateOp, expr: &'e Expr, terms: &mut Vec<&'e Expr>) {
    match expr {
        Expr::Aggregate {
            op: inner,
            left,
            right,
        } if *inner == op => {
            collect_terms(op, left, terms);
            collect_terms(op, right, terms);
        }
        other => terms.push(other),
    }
}

fn sum_values(values: &[Value]) -> Value {
    let mut total = Value::Integer(0);
    for value in values {
        total = match (&total, value) {
            (Value::Integer(a), Value::Integer(b)) => match a.checked_add(*b) {
                Some(n) => Value::Integer(n),
                None => return Value::error(EvalError::overflow("aggregate sum overflow")),
            },
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                // At least one side is a float here.
                Value::Float(total.as_float().unwrap_or(0.0) + value.as_float().unwrap_or(0.0))
            }
            _ => return Value::Undefined,
        };
    }
    total
}

fn agree_values(values: Vec<Value>) -> Value {
    let mut values = values.into_iter();
    let Some(first) = values.next() else {
        return Value::Undefined;
    };
    for value in values {
        if !first.is_identical(&value) {
            return Value::Null;
        }
    }
    first
}

/// Apply the `k` unit: divide a numeric result by 1024.
fn scale(value: Value, unit: Unit) -> Value {
    if !unit.is_kilo() {
        return value;
    }
    match value {
        Value::Integer(n) => Value::Integer(n / KILO),
        Value::Float(f) => Value::Float(f / KILO as f64),
        other => other,
    }
}

fn eval_arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mult => a.checked_mul(b),
                BinaryOp::Div => {
                    if b == 0 {
                        return Value::error(EvalError::division_by_zero());
                    }
                    a.checked_div(b)
                }
                _ => None,
            };
            result.map(Value::Integer).unwrap_or_else(|| {
                Value::error(EvalError::overflow(format!(
                    "integer overflow in {} {:?} {}",
                    a, op, b
                )))
            })
        }
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (a, b) = match (left.as_float(), right.as_float()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Value::Undefined,
            };
            match op {
                BinaryOp::Add => Value::Float(a + b),
                BinaryOp::Sub => Value::Float(a - b),
                BinaryOp::Mult => Value::Float(a * b),
                BinaryOp::Div => Value::Float(a / b),
                _ => Value::Undefined,
            }
        }
        // No numeric rule applies.
        _ => Value::Undefined,
    }
}

fn eval_comparison(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Value::Bool(compare(op, a, b)),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (left.as_float(), right.as_float()) {
                (Some(a), Some(b)) => Value::Bool(compare(op, &a, &b)),
                _ => Value::Undefined,
            }
        }
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::Eq => Value::Bool(a == b),
            BinaryOp::Neq => Value::Bool(a != b),
            _ => Value::Undefined,
        },
        (Value::String(a), Value::String(b)) => match op {
            BinaryOp::Eq => Value::Bool(strings_equal(a, b)),
            BinaryOp::Neq => Value::Bool(!strings_equal(a, b)),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn compare<T: PartialOrd>(op: BinaryOp, a: &T, b: &T) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Neq => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => false,
    }
}

fn strings_equal(a: &Arc<str>, b: &Arc<str>) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn eval_logical(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::And => Value::Bool(*a && *b),
            _ => Value::Bool(*a || *b),
        },
        _ => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EmptyScope;
    use crate::Record;
    use classad_parser::{parse_expr, Literal};

    fn eval_expr(src: &str) -> Value {
        let expr = parse_expr(src).unwrap();
        Evaluator::new(&EmptyScope).eval(&expr)
    }

    fn eval_in(record: &Record, src: &str) -> Value {
        let expr = parse_expr(src).unwrap();
        Evaluator::new(record).eval(&expr)
    }

    fn lit(value: Literal) -> Expr {
        Expr::literal(value)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_expr("1 + 2 * 3"), Value::Integer(7));
        assert_eq!(eval_expr("10 - 4 - 3"), Value::Integer(3));
        assert_eq!(eval_expr("7 / 2"), Value::Integer(3));
        assert_eq!(eval_expr("-7 / 2"), Value::Integer(-3));
        assert_eq!(eval_expr("1.5 * 2"), Value::Float(3.0));
        assert_eq!(eval_expr("3 / 2.0"), Value::Float(1.5));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(eval_expr("1 / 0").is_error());
        assert_eq!(eval_expr("1.0 / 0"), Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_overflow_is_error() {
        assert!(eval_expr("9223372036854775807 + 1").is_error());
    }

    #[test]
    fn test_unit_suffix() {
        assert_eq!(eval_expr("4096 k"), Value::Integer(4));
        assert_eq!(eval_expr("1 k + 1 k"), Value::Integer(0));
        assert_eq!(eval_expr("(1024 + 1024) k"), Value::Integer(2));
        assert_eq!(eval_expr("(1000 + 100) k"), Value::Integer(1));
        assert_eq!(eval_expr("512.0 k"), Value::Float(0.5));
        assert_eq!(eval_expr("-2048 k"), Value::Integer(-2));
    }

    #[test]
    fn test_unit_divides_the_arithmetic_result() {
        let sum = Expr::binary(BinaryOp::Add, Expr::integer(1000), Expr::integer(1000)).with_kilo();
        let evaluator = Evaluator::new(&EmptyScope);
        assert_eq!(evaluator.eval(&sum), Value::Integer(1));
    }

    #[test]
    fn test_mixed_arithmetic_is_undefined() {
        assert_eq!(eval_expr("1 + \"a\""), Value::Undefined);
        assert_eq!(eval_expr("TRUE * 2"), Value::Undefined);
        assert_eq!(eval_expr("UNDEFINED - 1"), Value::Undefined);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval_expr("1 < 2"), Value::Bool(true));
        assert_eq!(eval_expr("2 <= 1.5"), Value::Bool(false));
        assert_eq!(eval_expr("1.0 == 1"), Value::Bool(true));
        assert_eq!(eval_expr("TRUE != FALSE"), Value::Bool(true));
        assert_eq!(eval_expr("TRUE < FALSE"), Value::Undefined);
        assert_eq!(eval_expr("\"Linux\" == \"LINUX\""), Value::Bool(true));
        assert_eq!(eval_expr("\"a\" != \"A\""), Value::Bool(false));
        assert_eq!(eval_expr("\"a\" < \"b\""), Value::Undefined);
        assert_eq!(eval_expr("1 == \"1\""), Value::Undefined);
        assert_eq!(eval_expr("UNDEFINED == 1"), Value::Undefined);
    }

    #[test]
    fn test_meta_equality() {
        assert_eq!(eval_expr("UNDEFINED =?= UNDEFINED"), Value::Bool(true));
        assert_eq!(eval_expr("1 =?= 1.0"), Value::Bool(false));
        assert_eq!(eval_expr("\"a\" =?= \"A\""), Value::Bool(false));
        assert_eq!(eval_expr("\"a\" =!= \"A\""), Value::Bool(true));
        assert_eq!(eval_expr("x =?= UNDEFINED"), Value::Bool(true));
    }

    #[test]
    fn test_logical() {
        assert_eq!(eval_expr("TRUE && FALSE"), Value::Bool(false));
        assert_eq!(eval_expr("TRUE || FALSE"), Value::Bool(true));
        assert_eq!(eval_expr("FALSE && UNDEFINED"), Value::Undefined);
        assert_eq!(eval_expr("1 && TRUE"), Value::Undefined);
        assert_eq!(eval_expr("!TRUE"), Value::Bool(false));
        assert_eq!(eval_expr("!FALSE"), Value::Bool(true));
    }

    #[test]
    fn test_logical_operands_are_both_evaluated() {
        // The right side is circular; an eager && still reports it.
        let record = Record::parse("A = FALSE && B\nB = B").unwrap();
        assert!(eval_in(&record, "A").is_error());
    }

    #[test]
    fn test_null_wins_for_every_operator() {
        let evaluator = Evaluator::new(&EmptyScope);
        for op in BinaryOp::ALL {
            if op == BinaryOp::Assign {
                continue;
            }
            let null_left = Expr::binary(op, lit(Literal::Null), Expr::integer(1));
            assert_eq!(evaluator.eval(&null_left), Value::Null, "{:?}", op);

            let null_and_error = Expr::binary(op, lit(Literal::Error), lit(Literal::Null));
            assert_eq!(evaluator.eval(&null_and_error), Value::Null, "{:?}", op);

            let error_left = Expr::binary(op, lit(Literal::Error), Expr::integer(1));
            assert!(evaluator.eval(&error_left).is_error(), "{:?}", op);

            let error_right = Expr::binary(op, Expr::integer(1), lit(Literal::Error));
            assert!(evaluator.eval(&error_right).is_error(), "{:?}", op);
        }
    }

    #[test]
    fn test_assign_evaluates_right_side() {
        assert_eq!(eval_expr("A = 2 + 3"), Value::Integer(5));
    }

    #[test]
    fn test_variables_in_single_record() {
        let record = Record::parse("Memory = 64\nDisk = Memory * 2").unwrap();
        assert_eq!(eval_in(&record, "Disk"), Value::Integer(128));
        assert_eq!(eval_in(&record, "disk + MY.memory"), Value::Integer(192));
        assert_eq!(eval_in(&record, "Missing"), Value::Undefined);
        assert_eq!(eval_in(&record, "TARGET.Memory"), Value::Undefined);
        assert_eq!(eval_in(&record, "Other.Memory"), Value::Undefined);
    }

    #[test]
    fn test_circular_reference_is_error() {
        let record = Record::parse("A = B + 1\nB = A").unwrap();
        let value = eval_in(&record, "A");
        match value {
            Value::Error(err) => assert_eq!(err.kind, crate::EvalErrorKind::Circular),
            other => panic!("expected error, got {:?}", other),
        }
        // A non-circular attribute referenced twice is fine.
        let record = Record::parse("A = B + B\nB = 2").unwrap();
        assert_eq!(eval_in(&record, "A"), Value::Integer(4));
    }

    #[test]
    fn test_depth_limit() {
        let record = Record::parse("A = B\nB = C\nC = 1").unwrap();
        let expr = Expr::variable("A");
        let shallow = Evaluator::new(&record).with_options(EvalOptions::default().with_max_depth(2));
        assert!(shallow.eval(&expr).is_error());
        let deep = Evaluator::new(&record).with_options(EvalOptions::default().with_max_depth(3));
        assert_eq!(deep.eval(&expr), Value::Integer(1));
    }

    #[test]
    fn test_nesting_limit() {
        let chain = |terms: usize| {
            (1..terms).fold(Expr::integer(1), |acc, _| {
                Expr::binary(BinaryOp::Add, acc, Expr::integer(1))
            })
        };
        let evaluator =
            Evaluator::new(&EmptyScope).with_options(EvalOptions::default().with_max_nesting(50));

        assert_eq!(evaluator.eval(&chain(50)), Value::Integer(50));
        match evaluator.eval(&chain(51)) {
            Value::Error(err) => assert_eq!(err.kind, crate::EvalErrorKind::DepthExceeded),
            other => panic!("expected error, got {:?}", other),
        }
        // The counter unwinds after a refusal.
        assert_eq!(evaluator.eval(&chain(10)), Value::Integer(10));

        // Nodes of a referenced attribute count toward the same limit.
        let record = Record::parse("A = B + 1\nB = 1").unwrap();
        let tight = Evaluator::new(&record).with_options(EvalOptions::default().with_max_nesting(3));
        assert!(tight.eval_attribute("A").is_error());
        let roomy = Evaluator::new(&record).with_options(EvalOptions::default().with_max_nesting(4));
        assert_eq!(roomy.eval_attribute("A"), Value::Integer(2));
    }

    #[test]
    fn test_paired_scopes() {
        let mine = Record::parse("Memory = 64\nWant = TARGET.Size <= MY.Memory").unwrap();
        let target = Record::parse("Size = 32\nPeer = TARGET.Memory").unwrap();
        let evaluator = Evaluator::paired(&mine, &target);

        assert_eq!(evaluator.eval_attribute("MY.Want"), Value::Bool(true));
        // Resolved in the target with the pair swapped.
        assert_eq!(evaluator.eval_attribute("TARGET.Peer"), Value::Integer(64));
        assert_eq!(evaluator.eval_attribute("target.size"), Value::Integer(32));
        assert_eq!(evaluator.eval_attribute("MY.TARGET.Size"), Value::Integer(32));
        assert_eq!(evaluator.eval_attribute("Other.Size"), Value::Undefined);
    }

    #[test]
    fn test_paired_unscoped_name_is_error() {
        let mine = Record::parse("Memory = 64\nBad = Memory > 1").unwrap();
        let target = Record::new();
        let evaluator = Evaluator::paired(&mine, &target);

        match evaluator.eval_attribute("Memory") {
            Value::Error(err) => assert_eq!(err.kind, crate::EvalErrorKind::UnscopedName),
            other => panic!("expected error, got {:?}", other),
        }
        assert!(evaluator.eval_attribute("MY.Bad").is_error());
    }

    #[test]
    fn test_aggregates() {
        let evaluator = Evaluator::new(&EmptyScope);
        let terms = |values: Vec<Expr>| {
            let mut iter = values.into_iter().map(|v| Expr::assign("X", v));
            let first = iter.next().unwrap();
            iter.fold(first, |acc, t| Expr::aggregate(AggregateOp::AggAdd, acc, t))
        };

        let sum = terms(vec![Expr::integer(1), Expr::integer(2), Expr::integer(3)]);
        assert_eq!(evaluator.eval(&sum), Value::Integer(6));

        let promoted = terms(vec![Expr::integer(1), Expr::float(0.5)]);
        assert_eq!(evaluator.eval(&promoted), Value::Float(1.5));

        let agree = Expr::aggregate(
            AggregateOp::AggEq,
            Expr::aggregate(
                AggregateOp::AggEq,
                Expr::assign("X", Expr::string("a")),
                Expr::assign("X", Expr::string("a")),
            ),
            Expr::assign("X", Expr::string("a")),
        );
        assert_eq!(evaluator.eval(&agree), Value::from("a"));

        let disagree = Expr::aggregate(
            AggregateOp::AggEq,
            Expr::assign("X", Expr::integer(1)),
            Expr::assign("X", Expr::integer(2)),
        );
        assert_eq!(evaluator.eval(&disagree), Value::Null);
    }
}
