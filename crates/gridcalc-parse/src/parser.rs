//! Parser for formula expressions.
//!
//! Precedence-climbing over the token stream. The grammar: decimal
//! literals, `A1` cell references, binary `+ - * /` (left-associative,
//! `* /` binding tighter), unary `+ -`, and parenthesized
//! sub-expressions.
//!
//! A reference that lexes like a cell address but names a row or column
//! outside the grid is *not* a parse failure: it enters the AST as
//! `Position::INVALID` and evaluates to `#REF!`. This lets callers store
//! formulas over cells that do not exist yet while the dependency graph
//! keeps tracking them.

use std::error::Error;
use std::fmt::{self, Display};

use gridcalc_common::Position;

use crate::tokenizer::{Associativity, Token, TokenSubType, TokenType, Tokenizer, TokenizerError};

/// A custom error type for the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub message: String,
    pub position: Option<usize>,
}

impl Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "ParserError at position {}: {}", pos, self.message)
        } else {
            write!(f, "ParserError: {}", self.message)
        }
    }
}

impl Error for ParserError {}

impl From<TokenizerError> for ParserError {
    fn from(err: TokenizerError) -> Self {
        ParserError {
            message: err.message,
            position: Some(err.pos),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
}

impl UnaryOp {
    pub fn symbol(self) -> char {
        match self {
            UnaryOp::Plus => '+',
            UnaryOp::Minus => '-',
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    fn from_token(value: &str) -> Option<Self> {
        match value {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            _ => None,
        }
    }
}

/// The different types of AST nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum ASTNodeType {
    Number(f64),
    Reference(Position),
    UnaryOp {
        op: UnaryOp,
        expr: Box<ASTNode>,
    },
    BinaryOp {
        op: BinaryOp,
        left: Box<ASTNode>,
        right: Box<ASTNode>,
    },
}

/// An AST node represents a parsed formula element.
#[derive(Debug, Clone, PartialEq)]
pub struct ASTNode {
    pub node_type: ASTNodeType,
    pub source_token: Option<Token>,
}

impl ASTNode {
    pub fn new(node_type: ASTNodeType, source_token: Option<Token>) -> Self {
        ASTNode {
            node_type,
            source_token,
        }
    }

    /// Every position literal in the expression, in source order,
    /// duplicates preserved, invalid positions included.
    pub fn referenced_cells(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        self.collect_references(&mut cells);
        cells
    }

    fn collect_references(&self, cells: &mut Vec<Position>) {
        match &self.node_type {
            ASTNodeType::Number(_) => {}
            ASTNodeType::Reference(pos) => cells.push(*pos),
            ASTNodeType::UnaryOp { expr, .. } => expr.collect_references(cells),
            ASTNodeType::BinaryOp { left, right, .. } => {
                left.collect_references(cells);
                right.collect_references(cells);
            }
        }
    }
}

/// A parser for converting tokens into an AST.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let filtered_tokens = tokens
            .into_iter()
            .filter(|t| t.token_type != TokenType::Whitespace)
            .collect();
        Parser {
            tokens: filtered_tokens,
            position: 0,
        }
    }

    /// Parse the tokens into an AST.
    pub fn parse(&mut self) -> Result<ASTNode, ParserError> {
        if self.tokens.is_empty() {
            return Err(ParserError {
                message: "Empty formula".to_string(),
                position: None,
            });
        }

        let ast = self.parse_binary_op(0)?;
        if self.position < self.tokens.len() {
            return Err(ParserError {
                message: format!("Unexpected token {}", self.tokens[self.position]),
                position: Some(self.tokens[self.position].start),
            });
        }
        Ok(ast)
    }

    fn parse_binary_op(&mut self, min_precedence: u8) -> Result<ASTNode, ParserError> {
        let mut left = self.parse_unary_op()?;

        while self.position < self.tokens.len() {
            let token = &self.tokens[self.position];
            if token.token_type != TokenType::OpInfix {
                break;
            }

            let (precedence, associativity) =
                token.precedence().unwrap_or((0, Associativity::Left));
            if precedence < min_precedence {
                break;
            }

            let op_token = self.tokens[self.position].clone();
            self.position += 1;

            let next_min_precedence = if associativity == Associativity::Left {
                precedence + 1
            } else {
                precedence
            };

            let right = self.parse_binary_op(next_min_precedence)?;
            let op = BinaryOp::from_token(&op_token.value).ok_or_else(|| ParserError {
                message: format!("Unknown operator '{}'", op_token.value),
                position: Some(op_token.start),
            })?;
            left = ASTNode::new(
                ASTNodeType::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Some(op_token),
            );
        }

        Ok(left)
    }

    fn parse_unary_op(&mut self) -> Result<ASTNode, ParserError> {
        if self.position < self.tokens.len()
            && self.tokens[self.position].token_type == TokenType::OpPrefix
        {
            let op_token = self.tokens[self.position].clone();
            self.position += 1;
            let expr = self.parse_unary_op()?;
            let op = match op_token.value.as_str() {
                "+" => UnaryOp::Plus,
                _ => UnaryOp::Minus,
            };
            return Ok(ASTNode::new(
                ASTNodeType::UnaryOp {
                    op,
                    expr: Box::new(expr),
                },
                Some(op_token),
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ASTNode, ParserError> {
        if self.position >= self.tokens.len() {
            return Err(ParserError {
                message: "Unexpected end of formula".to_string(),
                position: None,
            });
        }

        let token = self.tokens[self.position].clone();
        match token.token_type {
            TokenType::Operand => {
                self.position += 1;
                self.parse_operand(token)
            }
            TokenType::Paren if token.subtype == TokenSubType::Open => {
                self.position += 1;
                let expr = self.parse_binary_op(0)?;
                if self.position >= self.tokens.len()
                    || self.tokens[self.position].token_type != TokenType::Paren
                    || self.tokens[self.position].subtype != TokenSubType::Close
                {
                    return Err(ParserError {
                        message: "Expected closing parenthesis".to_string(),
                        position: Some(token.start),
                    });
                }
                self.position += 1;
                Ok(expr)
            }
            _ => Err(ParserError {
                message: format!("Unexpected token {token}"),
                position: Some(token.start),
            }),
        }
    }

    fn parse_operand(&mut self, token: Token) -> Result<ASTNode, ParserError> {
        match token.subtype {
            TokenSubType::Number => {
                let value = token.value.parse::<f64>().map_err(|_| ParserError {
                    message: format!("Invalid number: {}", token.value),
                    position: Some(token.start),
                })?;
                Ok(ASTNode::new(ASTNodeType::Number(value), Some(token)))
            }
            TokenSubType::Reference => {
                // Out-of-range addresses (and the literal `#REF!` code) are
                // admitted as invalid positions; they error at evaluation.
                let pos = if token.value == "#REF!" {
                    Position::INVALID
                } else {
                    Position::from_a1(&token.value)
                };
                Ok(ASTNode::new(ASTNodeType::Reference(pos), Some(token)))
            }
            _ => Err(ParserError {
                message: format!("Unexpected operand {token}"),
                position: Some(token.start),
            }),
        }
    }
}

/// Parse a formula body (without the leading `=`) into an AST.
pub fn parse_formula(text: &str) -> Result<ASTNode, ParserError> {
    let tokens = Tokenizer::new(text)?.items;
    Parser::new(tokens).parse()
}
