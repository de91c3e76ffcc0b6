//! ClassAd expression parser.
//!
//! Turns source text such as `Requirements = (TARGET.Memory >= 64 k)` into
//! an [`Expr`] tree. The grammar is C-like infix with the operators
//! `= == != =?= =!= < <= > >= + - * / && || !`, double-quoted strings,
//! integer and float literals with an optional `k`/`K` unit suffix, and the
//! case-insensitive keywords `TRUE`, `FALSE`, `UNDEFINED`, `ERROR` and `NULL`.

pub mod ast;
mod lexer;
mod parser;

pub use ast::{AggregateOp, BinaryOp, Expr, Literal, Span, Unit};
pub use parser::{MAX_NESTING, MAX_TREE_DEPTH};

/// A parse error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// Result of parsing a ClassAd expression.
///
/// When the input holds a complete expression followed by stray tokens, the
/// expression is kept in `ast` alongside the error.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub ast: Option<Expr>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Returns true if parsing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.ast.is_some()
    }

    /// Returns true if there are any parse errors.
    pub fn is_err(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Converts to a Result carrying the first error, discarding any partial tree.
    pub fn into_result(self) -> Result<Expr, ParseError> {
        match (self.ast, self.errors.into_iter().next()) {
            (_, Some(err)) => Err(err),
            (Some(ast), None) => Ok(ast),
            (None, None) => Err(ParseError {
                message: "empty input".to_string(),
                span: 0..0,
            }),
        }
    }

    /// Unwraps the errors, panicking if there are none.
    pub fn unwrap_err(self) -> Vec<ParseError> {
        if self.errors.is_empty() {
            panic!("called unwrap_err on a ParseResult with no errors");
        }
        self.errors
    }
}

/// Parse a ClassAd expression from source.
pub fn parse(input: &str) -> ParseResult {
    let tokens = match lexer::lex(input) {
        Ok(tokens) => tokens,
        Err(e) => {
            return ParseResult {
                ast: None,
                errors: vec![ParseError {
                    message: e.message,
                    span: e.span,
                }],
            };
        }
    };

    let (ast, parse_errors) = parser::parse_tokens(&tokens);

    let errors: Vec<ParseError> = parse_errors
        .into_iter()
        .map(|e| ParseError {
            message: e.message,
            span: e.span,
        })
        .collect();

    ParseResult { ast, errors }
}

/// Parse an expression, returning the tree or the first error.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    parse(input).into_result()
}

/// Parse an assignment statement `name = expr`.
///
/// Fails when the text is not a well-formed expression or when its root is
/// not an assignment to a plain attribute name.
pub fn parse_assignment(input: &str) -> Result<Expr, ParseError> {
    let expr = parse_expr(input)?;
    if expr.is_assignment() {
        Ok(expr)
    } else {
        Err(ParseError {
            message: "expected an assignment of the form 'name = expr'".to_string(),
            span: 0..input.len(),
        })
    }
}
