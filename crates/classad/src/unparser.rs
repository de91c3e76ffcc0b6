//! ClassAd expression unparser (tree to source text).
//!
//! The output parses back to a tree that evaluates identically to the
//! input. Parentheses are emitted only where precedence requires them, so
//! formatting may differ from the input text.
//!
//! # Example
//!
//! ```
//! use classad::unparser::expr_to_string;
//! use classad_parser::parse_expr;
//!
//! let expr = parse_expr("A=(x+1)*2").unwrap();
//! assert_eq!(expr_to_string(&expr), "A = (x + 1) * 2");
//! ```

use classad_parser::{AggregateOp, BinaryOp, Expr, Literal, Unit};

/// Precedence of atoms and of nodes printed with their own parentheses.
const ATOM: u8 = 6;

/// Convert an expression tree to source text.
///
/// Recurses once per tree level. Trees from the parser are at most
/// [`MAX_TREE_DEPTH`](classad_parser::MAX_TREE_DEPTH) tall.
pub fn expr_to_string(expr: &Expr) -> String {
    unparse(expr)
}

/// Returns the precedence of a binary operator (higher = binds tighter).
fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Assign => 0,
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq
        | BinaryOp::Neq
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::MetaEq
        | BinaryOp::MetaNeq => 3,
        BinaryOp::Add | BinaryOp::Sub => 4,
        BinaryOp::Mult | BinaryOp::Div => 5,
    }
}

/// Returns the operator symbol for a binary operator.
fn binary_op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mult => "*",
        BinaryOp::Div => "/",
        BinaryOp::Eq => "==",
        BinaryOp::Neq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::MetaEq => "=?=",
        BinaryOp::MetaNeq => "=!=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Assign => "=",
    }
}

fn aggregate_name(op: AggregateOp) -> &'static str {
    match op {
        AggregateOp::AggAdd => "AGGADD",
        AggregateOp::AggEq => "AGGEQ",
    }
}

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, unit, .. } if !(unit.is_kilo() && op.is_arithmetic()) => {
            precedence(*op)
        }
        _ => ATOM,
    }
}

fn unparse(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value, unit } => unparse_literal(value, *unit),
        Expr::Variable(name) => name.clone(),
        Expr::Binary {
            op,
            left,
            right,
            unit,
        } => {
            let text = unparse_binary(*op, left, right);
            if unit.is_kilo() && op.is_arithmetic() {
                format!("({}) k", text)
            } else {
                text
            }
        }
        Expr::Aggregate { op, left, right } => {
            // Aggregates have no source syntax; this form is for display.
            format!("{}({}, {})", aggregate_name(*op), unparse(left), unparse(right))
        }
    }
}

fn unparse_literal(value: &Literal, unit: Unit) -> String {
    let text = match value {
        Literal::Integer(n) => n.to_string(),
        Literal::Float(f) if !f.is_finite() => {
            // No literal spelling: write an expression producing the same value.
            let numerator = if f.is_nan() {
                "0.0"
            } else if *f > 0.0 {
                "1.0"
            } else {
                "-1.0"
            };
            let text = format!("({} / 0.0)", numerator);
            return if unit.is_kilo() {
                format!("({}) k", text)
            } else {
                text
            };
        }
        Literal::Float(f) => format_float(*f),
        Literal::String(s) => return format!("\"{}\"", escape_string(s)),
        Literal::Bool(true) => return "TRUE".to_string(),
        Literal::Bool(false) => return "FALSE".to_string(),
        Literal::Undefined => return "UNDEFINED".to_string(),
        Literal::Error => return "ERROR".to_string(),
        Literal::Null => return "NULL".to_string(),
    };

    if unit.is_kilo() {
        format!("{} k", text)
    } else {
        text
    }
}

fn unparse_binary(op: BinaryOp, left: &Expr, right: &Expr) -> String {
    let prec = precedence(op);
    // Assignment groups to the right, everything else to the left.
    let (left_min, right_min) = if op == BinaryOp::Assign {
        (prec + 1, prec)
    } else {
        (prec, prec + 1)
    };

    format!(
        "{} {} {}",
        unparse_with_parens_if_needed(left, left_min),
        binary_op_symbol(op),
        unparse_with_parens_if_needed(right, right_min)
    )
}

/// Unparse a subexpression, parenthesizing it if it binds looser than `min_prec`.
fn unparse_with_parens_if_needed(expr: &Expr, min_prec: u8) -> String {
    let text = unparse(expr);
    if expr_precedence(expr) < min_prec {
        format!("({})", text)
    } else {
        text
    }
}

/// Format a float so that it reads back as the same float.
pub(crate) fn format_float(f: f64) -> String {
    let s = f.to_string();
    // Ensure we have a decimal point to distinguish from int
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{}.0", s)
    }
}

/// Escape a string for inclusion between double quotes.
pub(crate) fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use classad_parser::parse_expr;

    fn roundtrip(source: &str) -> String {
        let expr = parse_expr(source).unwrap();
        let printed = expr_to_string(&expr);
        let reparsed = parse_expr(&printed)
            .unwrap_or_else(|e| panic!("printed form {:?} does not parse: {}", printed, e));
        assert_eq!(reparsed, expr, "printed form {:?}", printed);
        printed
    }

    #[test]
    fn test_literals() {
        assert_eq!(roundtrip("42"), "42");
        assert_eq!(roundtrip("-42"), "-42");
        assert_eq!(roundtrip("1.3"), "1.3");
        assert_eq!(roundtrip("2.0"), "2.0");
        assert_eq!(roundtrip("1e3"), "1000.0");
        assert_eq!(roundtrip("true"), "TRUE");
        assert_eq!(roundtrip("undefined"), "UNDEFINED");
        assert_eq!(roundtrip("error"), "ERROR");
        assert_eq!(roundtrip("null"), "NULL");
    }

    #[test]
    fn test_strings() {
        assert_eq!(roundtrip(r#""hello""#), r#""hello""#);
        assert_eq!(roundtrip(r#""say \"hi\"""#), r#""say \"hi\"""#);
        assert_eq!(roundtrip(r#""c:\\dir""#), r#""c:\\dir""#);
    }

    #[test]
    fn test_units() {
        assert_eq!(roundtrip("4096 k"), "4096 k");
        assert_eq!(roundtrip("-4096K"), "-4096 k");
        assert_eq!(roundtrip("(1 + 2) k"), "(1 + 2) k");
        assert_eq!(roundtrip("(1 + 2) k * 3"), "(1 + 2) k * 3");
        assert_eq!(roundtrip("1 k + 1 k"), "1 k + 1 k");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(roundtrip("1 + 2 * 3"), "1 + 2 * 3");
        assert_eq!(roundtrip("(1 + 2) * 3"), "(1 + 2) * 3");
        assert_eq!(roundtrip("1 - (2 - 3)"), "1 - (2 - 3)");
        assert_eq!(roundtrip("(1 - 2) - 3"), "1 - 2 - 3");
        assert_eq!(roundtrip("a || b && c"), "a || b && c");
        assert_eq!(roundtrip("(a || b) && c"), "(a || b) && c");
        assert_eq!(roundtrip("a == (b == c)"), "a == (b == c)");
        assert_eq!(roundtrip("(a = 1) + 2"), "(a = 1) + 2");
    }

    #[test]
    fn test_assignment() {
        assert_eq!(
            roundtrip("Requirements=(a>3)&&(b>=1.3)&&(c<MY.rank)"),
            "Requirements = a > 3 && b >= 1.3 && c < MY.rank"
        );
        assert_eq!(roundtrip("a = b = 1"), "a = b = 1");
    }

    #[test]
    fn test_desugared_unary() {
        assert_eq!(roundtrip("!x"), "x == FALSE");
        assert_eq!(roundtrip("-x"), "0 - x");
        assert_eq!(roundtrip("3 - -5"), "3 - -5");
    }

    #[test]
    fn test_non_finite_floats() {
        let inf = Expr::float(f64::INFINITY);
        assert_eq!(expr_to_string(&inf), "(1.0 / 0.0)");
        assert_eq!(expr_to_string(&Expr::float(f64::NAN)), "(0.0 / 0.0)");
    }

    #[test]
    fn test_aggregate_display() {
        let agg = Expr::aggregate(
            AggregateOp::AggAdd,
            Expr::assign("X", Expr::integer(1)),
            Expr::assign("X", Expr::integer(2)),
        );
        assert_eq!(expr_to_string(&agg), "AGGADD(X = 1, X = 2)");
    }
}
