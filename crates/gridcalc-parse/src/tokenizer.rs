//! Lexer for formula expressions (the text after the leading `=`).
//!
//! The token stream keeps whitespace tokens; the parser filters them. A
//! reference token is anything that *lexes* like a cell address — range
//! checking happens when the parser converts it to a `Position`, so an
//! out-of-range address like `AAAA1` is still a single well-formed token.

use std::error::Error;
use std::fmt::{self, Display};

/// Represents operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// A custom error type for the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenizerError at position {}: {}", self.pos, self.message)
    }
}

impl Error for TokenizerError {}

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Operand,
    OpPrefix,
    OpInfix,
    Paren,
    Whitespace,
}

/// The subtype of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSubType {
    None,
    Number,
    Reference,
    Open,
    Close,
}

/// A token in a formula, with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: String,
    pub token_type: TokenType,
    pub subtype: TokenSubType,
    pub start: usize,
    pub end: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{:?} subtype: {:?} value: {}>",
            self.token_type, self.subtype, self.value
        )
    }
}

impl Token {
    fn from_slice(
        source: &str,
        token_type: TokenType,
        subtype: TokenSubType,
        start: usize,
        end: usize,
    ) -> Self {
        Token {
            value: source[start..end].to_string(),
            token_type,
            subtype,
            start,
            end,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.token_type, TokenType::OpPrefix | TokenType::OpInfix)
    }

    /// Binding power of an operator token. Prefix signs bind tighter
    /// than any infix operator and nest right-to-left.
    pub fn precedence(&self) -> Option<(u8, Associativity)> {
        match self.token_type {
            TokenType::OpInfix => match self.value.as_str() {
                "+" | "-" => Some((1, Associativity::Left)),
                "*" | "/" => Some((2, Associativity::Left)),
                _ => None,
            },
            TokenType::OpPrefix => Some((3, Associativity::Right)),
            _ => None,
        }
    }
}

/// Splits a formula body into tokens.
pub struct Tokenizer {
    pub items: Vec<Token>,
}

const REF_ERROR_CODE: &str = "#REF!";

impl Tokenizer {
    pub fn new(formula: &str) -> Result<Self, TokenizerError> {
        let bytes = formula.as_bytes();
        let mut items: Vec<Token> = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let b = bytes[pos];
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    let start = pos;
                    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                    items.push(Token::from_slice(
                        formula,
                        TokenType::Whitespace,
                        TokenSubType::None,
                        start,
                        pos,
                    ));
                }
                b'(' => {
                    items.push(Token::from_slice(
                        formula,
                        TokenType::Paren,
                        TokenSubType::Open,
                        pos,
                        pos + 1,
                    ));
                    pos += 1;
                }
                b')' => {
                    items.push(Token::from_slice(
                        formula,
                        TokenType::Paren,
                        TokenSubType::Close,
                        pos,
                        pos + 1,
                    ));
                    pos += 1;
                }
                b'+' | b'-' => {
                    let token_type = if expects_operand(&items) {
                        TokenType::OpPrefix
                    } else {
                        TokenType::OpInfix
                    };
                    items.push(Token::from_slice(
                        formula,
                        token_type,
                        TokenSubType::None,
                        pos,
                        pos + 1,
                    ));
                    pos += 1;
                }
                b'*' | b'/' => {
                    items.push(Token::from_slice(
                        formula,
                        TokenType::OpInfix,
                        TokenSubType::None,
                        pos,
                        pos + 1,
                    ));
                    pos += 1;
                }
                b'0'..=b'9' => {
                    let end = scan_number(bytes, pos).map_err(|at| TokenizerError {
                        message: format!("Malformed number starting at '{}'", &formula[pos..at]),
                        pos: at,
                    })?;
                    items.push(Token::from_slice(
                        formula,
                        TokenType::Operand,
                        TokenSubType::Number,
                        pos,
                        end,
                    ));
                    pos = end;
                }
                b'A'..=b'Z' => {
                    let end = scan_reference(bytes, pos).ok_or_else(|| TokenizerError {
                        message: format!("Malformed cell reference at '{}'", truncate(formula, pos)),
                        pos,
                    })?;
                    items.push(Token::from_slice(
                        formula,
                        TokenType::Operand,
                        TokenSubType::Reference,
                        pos,
                        end,
                    ));
                    pos = end;
                }
                b'#' => {
                    // Only the `#REF!` code is a legal operand; it denotes a
                    // reference that fell off the grid.
                    if formula[pos..].starts_with(REF_ERROR_CODE) {
                        items.push(Token::from_slice(
                            formula,
                            TokenType::Operand,
                            TokenSubType::Reference,
                            pos,
                            pos + REF_ERROR_CODE.len(),
                        ));
                        pos += REF_ERROR_CODE.len();
                    } else {
                        return Err(TokenizerError {
                            message: format!("Unknown error code at '{}'", truncate(formula, pos)),
                            pos,
                        });
                    }
                }
                _ => {
                    let ch = formula[pos..].chars().next().unwrap_or('?');
                    return Err(TokenizerError {
                        message: format!("Unexpected character '{ch}'"),
                        pos,
                    });
                }
            }
        }

        Ok(Tokenizer { items })
    }
}

/// True when the next `+`/`-` must be a sign rather than an infix operator.
fn expects_operand(items: &[Token]) -> bool {
    match items.iter().rev().find(|t| t.token_type != TokenType::Whitespace) {
        None => true,
        Some(t) => {
            t.is_operator() || (t.token_type == TokenType::Paren && t.subtype == TokenSubType::Open)
        }
    }
}

/// Scan `[0-9]+ ('.' [0-9]*)? ([eE] [+-]? [0-9]+)?`; returns the end offset
/// or the offset of the offending byte.
fn scan_number(bytes: &[u8], start: usize) -> Result<usize, usize> {
    let mut pos = start;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        pos += 1;
        if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
            pos += 1;
        }
        let exp_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == exp_start {
            return Err(pos);
        }
    }
    Ok(pos)
}

/// Scan `[A-Z]+ [0-9]+`; `None` when the digits are missing.
fn scan_reference(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    while pos < bytes.len() && bytes[pos].is_ascii_uppercase() {
        pos += 1;
    }
    let digit_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == digit_start {
        return None;
    }
    Some(pos)
}

fn truncate(formula: &str, pos: usize) -> &str {
    let tail = &formula[pos..];
    match tail.char_indices().nth(8) {
        Some((end, _)) => &tail[..end],
        None => tail,
    }
}
