//! Printing an expression and parsing the text back gives the same tree.

use classad::{expr_to_string, parse_expr, BinaryOp, Expr};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        any::<i64>()
            .prop_filter("no literal spelling", |n| *n != i64::MIN)
            .prop_map(Expr::integer),
        (-1.0e9f64..1.0e9).prop_map(Expr::float),
        (0i64..100_000).prop_map(|n| Expr::integer(n).with_kilo()),
        "[a-zA-Z0-9 _,\\\\\"]{0,8}".prop_map(Expr::string),
        any::<bool>().prop_map(Expr::bool),
        Just(Expr::undefined()),
        Just(Expr::error()),
        Just(Expr::null()),
        "(MY\\.|TARGET\\.)?[a-z]{1,4}[0-9]{1,2}".prop_map(Expr::variable),
    ]
}

fn operator() -> impl Strategy<Value = BinaryOp> {
    prop::sample::select(
        BinaryOp::ALL
            .iter()
            .copied()
            .filter(|op| *op != BinaryOp::Assign)
            .collect::<Vec<_>>(),
    )
}

fn expr() -> impl Strategy<Value = Expr> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        (operator(), inner.clone(), inner, any::<bool>()).prop_map(|(op, left, right, kilo)| {
            let node = Expr::binary(op, left, right);
            if kilo && op.is_arithmetic() {
                node.with_kilo()
            } else {
                node
            }
        })
    })
}

proptest! {
    #[test]
    fn printed_expressions_parse_back(expr in expr()) {
        let printed = expr_to_string(&expr);
        let reparsed = parse_expr(&printed);
        prop_assert!(reparsed.is_ok(), "{:?} did not parse", printed);
        prop_assert_eq!(reparsed.unwrap(), expr);
    }

    #[test]
    fn printed_assignments_parse_back(name in "[A-Z][a-z]{0,6}[0-9]", rhs in expr()) {
        let assignment = Expr::assign(name, rhs);
        let printed = expr_to_string(&assignment);
        prop_assert_eq!(parse_expr(&printed).unwrap(), assignment);
    }
}
