//! Common test utilities for classad-parser integration tests.

use classad_parser::{parse, Expr, ParseError};

/// Parse input and assert it succeeds, returning the tree.
#[allow(dead_code)]
pub fn assert_parses(input: &str) -> Expr {
    let result = parse(input);
    if !result.errors.is_empty() {
        panic!(
            "failed to parse '{}': {:?}",
            input,
            result
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
        );
    }
    result.ast.expect("expected expression")
}

/// Parse input and assert it fails, returning the errors.
#[allow(dead_code)]
pub fn assert_parse_error(input: &str) -> Vec<ParseError> {
    let result = parse(input);
    if result.errors.is_empty() {
        panic!("expected parse error for '{}', but got: {:?}", input, result.ast);
    }
    result.errors
}
