//! Typed evaluation of named attributes.
//!
//! These helpers look an attribute up in `mine` (falling back to `target`),
//! evaluate it with `(mine, target)` as the context and convert the result.
//! When no target is given the single-scope rules apply.

use super::{Evaluator, Scope, Value};

/// Evaluate the attribute `name` and return the raw value, or `None` when
/// neither scope defines it.
pub fn eval_attribute(name: &str, mine: &dyn Scope, target: Option<&dyn Scope>) -> Option<Value> {
    let rhs = match mine.lookup(name) {
        Ok(Some(rhs)) => rhs,
        Ok(None) => target?.lookup(name).ok().flatten()?,
        Err(err) => return Some(Value::error(err)),
    };

    let evaluator = match target {
        Some(target) => Evaluator::paired(mine, target),
        None => Evaluator::new(mine),
    };
    Some(evaluator.eval(rhs))
}

pub fn eval_string(name: &str, mine: &dyn Scope, target: Option<&dyn Scope>) -> Option<String> {
    match eval_attribute(name, mine, target)? {
        Value::String(s) => Some(s.to_string()),
        _ => None,
    }
}

pub fn eval_integer(name: &str, mine: &dyn Scope, target: Option<&dyn Scope>) -> Option<i64> {
    match eval_attribute(name, mine, target)? {
        Value::Integer(n) => Some(n),
        Value::Bool(b) => Some(b as i64),
        _ => None,
    }
}

pub fn eval_float(name: &str, mine: &dyn Scope, target: Option<&dyn Scope>) -> Option<f64> {
    eval_attribute(name, mine, target)?.as_float()
}

/// Evaluate a named boolean policy expression (`START`, `SUSPEND`, ...)
/// of `mine` against `target`. Non-zero numbers count as true.
pub fn eval_bool(expr_name: &str, mine: &dyn Scope, target: &dyn Scope) -> Option<bool> {
    eval_attribute(expr_name, mine, Some(target))?.truthiness()
}

/// [`eval_bool`] with an optional target.
pub fn eval_bool_opt(name: &str, mine: &dyn Scope, target: Option<&dyn Scope>) -> Option<bool> {
    eval_attribute(name, mine, target)?.truthiness()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    #[test]
    fn policy_expressions_against_a_job() {
        let machine = Record::parse(
            "Memory = 2048\n\
             KeyboardIdle = 1200\n\
             START = MY.KeyboardIdle > 15 * 60 && TARGET.ImageSize < MY.Memory\n\
             SUSPEND = MY.KeyboardIdle < 60\n\
             KILL = FALSE",
        )
        .unwrap();
        let job = Record::parse("ImageSize = 512").unwrap();

        assert_eq!(eval_bool("START", &machine, &job), Some(true));
        assert_eq!(eval_bool("SUSPEND", &machine, &job), Some(false));
        assert_eq!(eval_bool("Kill", &machine, &job), Some(false));
        assert_eq!(eval_bool("VACATE", &machine, &job), None);

        let big_job = Record::parse("ImageSize = 4096").unwrap();
        assert_eq!(eval_bool("START", &machine, &big_job), Some(false));
    }

    #[test]
    fn falls_back_to_target_definition() {
        let mine = Record::parse("A = 1").unwrap();
        let target = Record::parse("B = MY.A").unwrap();

        // B is found in the target but evaluated with (mine, target).
        assert_eq!(eval_integer("B", &mine, Some(&target)), Some(1));
    }

    #[test]
    fn typed_conversions() {
        let record = Record::parse("S = \"x\"\nI = 2 + 2\nF = 1 / 2.0\nB = 3 > 2\nN = 0").unwrap();

        assert_eq!(eval_string("S", &record, None).as_deref(), Some("x"));
        assert_eq!(eval_integer("I", &record, None), Some(4));
        assert_eq!(eval_integer("B", &record, None), Some(1));
        assert_eq!(eval_float("F", &record, None), Some(0.5));
        assert_eq!(eval_float("I", &record, None), Some(4.0));
        assert_eq!(eval_bool_opt("B", &record, None), Some(true));
        assert_eq!(eval_bool_opt("N", &record, None), Some(false));
        assert_eq!(eval_string("I", &record, None), None);
    }
}
