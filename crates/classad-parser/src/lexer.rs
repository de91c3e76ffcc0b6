//! ClassAd lexer using logos.

use logos::Logos;

/// A span in the source input (byte offsets).
pub type Span = std::ops::Range<usize>;

/// A token with its source span.
pub type SpannedToken = (Token, Span);

/// Lexer error with span information.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// ClassAd tokens.
///
/// Keywords (`TRUE`, `FALSE`, `UNDEFINED`, `ERROR`, `NULL`) and the unit
/// suffix `k` are lexed as identifiers and recognized by the parser, since
/// all of them are case-insensitive.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // === Numeric Literals ===
    #[regex(r"[0-9]+", lex_integer, priority = 1)]
    Int(i64),

    // Float with decimal point and optional exponent: 1.5, 1.5e10
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", lex_float, priority = 3)]
    // Float with exponent only: 1e10, 1E-5
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", lex_float, priority = 2)]
    Float(f64),

    // === String Literals ===
    #[regex(r#"""#, lex_string)]
    String(String),

    // === Identifier ===
    // Scoped names keep their prefix: `MY.Memory`, `TARGET.Arch`.
    #[regex(
        r"[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*",
        |lex| lex.slice().to_string(),
        priority = 0
    )]
    Ident(String),

    // === Operators (multi-char first) ===
    #[token("=?=")]
    MetaEq,
    #[token("=!=")]
    MetaNe,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    And,
    #[token("||")]
    Or,

    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::MetaEq => write!(f, "=?="),
            Token::MetaNe => write!(f, "=!="),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Not => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

// === Lexer Callbacks ===

fn lex_integer(lex: &mut logos::Lexer<Token>) -> Option<i64> {
    lex.slice().parse().ok()
}

fn lex_float(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn lex_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let remainder = lex.remainder();
    let mut chars = remainder.chars();
    let mut result = String::new();
    let mut consumed = 0;

    while let Some(c) = chars.next() {
        consumed += c.len_utf8();
        match c {
            '"' => {
                lex.bump(consumed);
                return Some(result);
            }
            '\\' => {
                let escaped = chars.next()?;
                consumed += escaped.len_utf8();
                match escaped {
                    '"' => result.push('"'),
                    '\\' => result.push('\\'),
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    // Unknown escapes are kept verbatim.
                    other => {
                        result.push('\\');
                        result.push(other);
                    }
                }
            }
            '\n' => return None,
            _ => result.push(c),
        }
    }

    None // Unclosed string
}

// === Public Lexer API ===

/// Tokenize the input string.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                let text = &input[span.clone()];
                let message = if text.starts_with('"') {
                    "unterminated string literal".to_string()
                } else if text.bytes().all(|b| b.is_ascii_digit()) {
                    "integer literal out of range".to_string()
                } else {
                    format!("unexpected character '{}'", text)
                };
                return Err(LexError { message, span });
            }
        }
    }

    Ok(tokens)
}
