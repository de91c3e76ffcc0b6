//! ClassAd parser - hand-written recursive descent.

use crate::ast::{BinaryOp, Expr, Literal};
use crate::lexer::{Span, SpannedToken, Token};

/// Parse error with span information.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// Deepest nesting of parentheses, unary operators and chained
/// assignments the parser will descend into.
pub const MAX_NESTING: usize = 256;

/// Tallest operator tree the parser will build.
pub const MAX_TREE_DEPTH: usize = 512;

/// A parsed expression and the height of its tree.
struct Node {
    expr: Expr,
    depth: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Node { expr, depth: 1 }
    }
}

fn too_deep(span: Span) -> ParseError {
    ParseError {
        message: "expression nested too deeply".to_string(),
        span,
    }
}

/// Build `left op right`, refusing trees taller than [`MAX_TREE_DEPTH`].
fn join(op: BinaryOp, left: Node, right: Node, span: Span) -> Result<Node, ParseError> {
    let depth = left.depth.max(right.depth) + 1;
    if depth > MAX_TREE_DEPTH {
        return Err(too_deep(span));
    }
    Ok(Node {
        expr: Expr::binary(op, left.expr, right.expr),
        depth,
    })
}

/// Recursive descent parser for ClassAd expressions.
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [SpannedToken]) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    // === Utility Methods ===

    /// Peek at the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Get the span of the current token.
    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    /// Get the span representing end-of-input.
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek().map_or(false, |t| t == token)
    }

    /// Consume the current token if it matches, returning its span.
    fn match_token(&mut self, token: &Token) -> Option<Span> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Some(span)
        } else {
            None
        }
    }

    /// Expect a specific token, returning an error if not found.
    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        self.match_token(token)
            .ok_or_else(|| self.unexpected(&format!("expected '{}'", token)))
    }

    fn unexpected(&self, context: &str) -> ParseError {
        let found = match self.peek() {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        };
        ParseError {
            message: format!("{}, found {}", context, found),
            span: self.peek_span(),
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested(
        &mut self,
        span: Span,
        parse: impl FnOnce(&mut Self) -> Result<Node, ParseError>,
    ) -> Result<Node, ParseError> {
        if self.nesting >= MAX_NESTING {
            return Err(too_deep(span));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // === Expression Parsing ===

    /// Parse an expression (entry point).
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assign().map(|node| node.expr)
    }

    /// Parse assignment: name = expr (right associative, lowest precedence)
    fn parse_assign(&mut self) -> Result<Node, ParseError> {
        let left = self.parse_or()?;

        match self.match_token(&Token::Assign) {
            Some(span) => {
                let right = self.nested(span.clone(), Self::parse_assign)?;
                join(BinaryOp::Assign, left, right, span)
            }
            None => Ok(left),
        }
    }

    /// Parse logical OR: expr || expr
    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_and()?;

        while let Some(span) = self.match_token(&Token::Or) {
            let right = self.parse_and()?;
            left = join(BinaryOp::Or, left, right, span)?;
        }

        Ok(left)
    }

    /// Parse logical AND: expr && expr
    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_relation()?;

        while let Some(span) = self.match_token(&Token::And) {
            let right = self.parse_relation()?;
            left = join(BinaryOp::And, left, right, span)?;
        }

        Ok(left)
    }

    /// Parse relational operators: == != < <= > >= =?= =!=
    fn parse_relation(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_addition()?;

        while let Some(op) = self.peek_relop() {
            let span = self.peek_span();
            self.advance();
            let right = self.parse_addition()?;
            left = join(op, left, right, span)?;
        }

        Ok(left)
    }

    /// Check if the current token is a relational operator.
    fn peek_relop(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Neq),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::MetaEq => Some(BinaryOp::MetaEq),
            Token::MetaNe => Some(BinaryOp::MetaNeq),
            _ => None,
        }
    }

    /// Parse additive operators: + -
    fn parse_addition(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_mult()?;

        loop {
            let span = self.peek_span();
            let op = if self.match_token(&Token::Plus).is_some() {
                BinaryOp::Add
            } else if self.match_token(&Token::Minus).is_some() {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.parse_mult()?;
            left = join(op, left, right, span)?;
        }

        Ok(left)
    }

    /// Parse multiplicative operators: * /
    fn parse_mult(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let span = self.peek_span();
            let op = if self.match_token(&Token::Star).is_some() {
                BinaryOp::Mult
            } else if self.match_token(&Token::Slash).is_some() {
                BinaryOp::Div
            } else {
                break;
            };

            let right = self.parse_unary()?;
            left = join(op, left, right, span)?;
        }

        Ok(left)
    }

    /// Parse unary operators: - !
    ///
    /// The tree has no unary node: `!e` becomes `e == FALSE` and `-e`
    /// becomes `0 - e`, except that a minus in front of a numeric literal
    /// is folded into the literal.
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if let Some(span) = self.match_token(&Token::Not) {
            let operand = self.nested(span.clone(), Self::parse_unary)?;
            return join(
                BinaryOp::Eq,
                operand,
                Node::leaf(Expr::bool(false)),
                span,
            );
        }

        if let Some(span) = self.match_token(&Token::Minus) {
            let operand = self.nested(span.clone(), Self::parse_unary)?;
            return negate(operand, span);
        }

        self.parse_postfix()
    }

    /// Parse an atom followed by an optional `k`/`K` unit suffix.
    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut atom = self.parse_atom()?;

        let takes_unit = match &atom.expr {
            Expr::Literal { value, .. } => value.is_numeric(),
            Expr::Binary { op, .. } => op.is_arithmetic(),
            _ => false,
        };

        if takes_unit && self.peek_unit_suffix() {
            self.advance();
            atom.expr = atom.expr.with_kilo();
        }

        Ok(atom)
    }

    fn peek_unit_suffix(&self) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case("k"))
    }

    /// Parse a primary expression.
    fn parse_atom(&mut self) -> Result<Node, ParseError> {
        let span = self.peek_span();

        match self.peek().cloned() {
            Some(Token::Int(n)) => {
                self.advance();
                Ok(Node::leaf(Expr::integer(n)))
            }
            Some(Token::Float(f)) => {
                self.advance();
                Ok(Node::leaf(Expr::float(f)))
            }
            Some(Token::String(s)) => {
                self.advance();
                Ok(Node::leaf(Expr::string(s)))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                let expr = keyword_literal(&name)
                    .map(Expr::literal)
                    .unwrap_or_else(|| Expr::Variable(name));
                Ok(Node::leaf(expr))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.nested(span, Self::parse_assign)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(_) => Err(self.unexpected("expected expression")),
            None => Err(ParseError {
                message: "unexpected end of input".to_string(),
                span,
            }),
        }
    }
}

/// Recognize the case-insensitive keyword literals.
fn keyword_literal(name: &str) -> Option<Literal> {
    const KEYWORDS: [(&str, Literal); 5] = [
        ("TRUE", Literal::Bool(true)),
        ("FALSE", Literal::Bool(false)),
        ("UNDEFINED", Literal::Undefined),
        ("ERROR", Literal::Error),
        ("NULL", Literal::Null),
    ];

    KEYWORDS
        .iter()
        .find(|(kw, _)| name.eq_ignore_ascii_case(kw))
        .map(|(_, lit)| lit.clone())
}

fn negate(node: Node, span: Span) -> Result<Node, ParseError> {
    match node.expr {
        Expr::Literal {
            value: Literal::Integer(n),
            unit,
        } if n.checked_neg().is_some() => Ok(Node::leaf(Expr::Literal {
            value: Literal::Integer(-n),
            unit,
        })),
        Expr::Literal {
            value: Literal::Float(f),
            unit,
        } => Ok(Node::leaf(Expr::Literal {
            value: Literal::Float(-f),
            unit,
        })),
        expr => join(
            BinaryOp::Sub,
            Node::leaf(Expr::integer(0)),
            Node {
                expr,
                depth: node.depth,
            },
            span,
        ),
    }
}

/// Parse tokens into an expression tree.
pub fn parse_tokens(tokens: &[SpannedToken]) -> (Option<Expr>, Vec<ParseError>) {
    if tokens.is_empty() {
        return (
            None,
            vec![ParseError {
                message: "empty input".to_string(),
                span: 0..0,
            }],
        );
    }

    let mut parser = Parser::new(tokens);
    match parser.parse_expr() {
        Ok(ast) => {
            if parser.at_end() {
                (Some(ast), vec![])
            } else {
                (
                    Some(ast),
                    vec![ParseError {
                        message: "unexpected tokens after expression".to_string(),
                        span: parser.peek_span(),
                    }],
                )
            }
        }
        Err(e) => (None, vec![e]),
    }
}
