//! Formula AST evaluation.

use gridcalc_common::FormulaError;
use gridcalc_parse::parser::{ASTNode, ASTNodeType, BinaryOp, UnaryOp};

use crate::traits::ReferenceResolver;

/// Walks a formula AST against a resolver.
///
/// Errors short-circuit the whole expression; discovery order is
/// left-to-right, depth-first. Division by zero raises `Div` here; any
/// other non-finite result (overflow, `inf * 0`) flows out as the raw
/// `f64` and is classified by the cell layer, which owns the finiteness
/// contract for cached values.
pub struct Interpreter<'a> {
    resolver: &'a dyn ReferenceResolver,
}

impl<'a> Interpreter<'a> {
    pub fn new(resolver: &'a dyn ReferenceResolver) -> Self {
        Self { resolver }
    }

    pub fn evaluate(&self, node: &ASTNode) -> Result<f64, FormulaError> {
        match &node.node_type {
            ASTNodeType::Number(n) => Ok(*n),
            ASTNodeType::Reference(pos) => {
                if !pos.is_valid() {
                    return Err(FormulaError::Ref);
                }
                self.resolver.resolve_cell_number(*pos)
            }
            ASTNodeType::UnaryOp { op, expr } => self.eval_unary(*op, expr),
            ASTNodeType::BinaryOp { op, left, right } => self.eval_binary(*op, left, right),
        }
    }

    fn eval_unary(&self, op: UnaryOp, expr: &ASTNode) -> Result<f64, FormulaError> {
        let v = self.evaluate(expr)?;
        Ok(match op {
            UnaryOp::Plus => v,
            UnaryOp::Minus => -v,
        })
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &ASTNode,
        right: &ASTNode,
    ) -> Result<f64, FormulaError> {
        let l = self.evaluate(left)?;
        let r = self.evaluate(right)?;
        match op {
            BinaryOp::Add => Ok(l + r),
            BinaryOp::Sub => Ok(l - r),
            BinaryOp::Mul => Ok(l * r),
            BinaryOp::Div => {
                if r == 0.0 {
                    Err(FormulaError::Div)
                } else {
                    Ok(l / r)
                }
            }
        }
    }
}
