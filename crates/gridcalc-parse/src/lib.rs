pub mod parser;
pub mod pretty;
pub mod tokenizer;

pub use parser::{ASTNode, ASTNodeType, BinaryOp, ParserError, UnaryOp, parse_formula};
pub use pretty::canonical_formula;
pub use tokenizer::{Associativity, Token, TokenSubType, TokenType, Tokenizer, TokenizerError};

// Re-export common types
pub use gridcalc_common::{FormulaError, Position};
