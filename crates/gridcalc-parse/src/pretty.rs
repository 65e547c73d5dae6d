//! Canonical text form of a parsed formula.
//!
//! Emits the minimum parentheses that preserve the expression's meaning
//! under the grammar's precedence and associativity. The output is
//! idempotent under parse → print → parse. Parentheses are decided per
//! (parent operator, child operator, side) rather than by raw precedence
//! numbers, so value-preserving rewrites like `-(1*2)` → `-1*2` stay
//! unparenthesized while `1-(2-3)` keeps its grouping.

use std::fmt::Write;

use crate::parser::{ASTNode, ASTNodeType, BinaryOp};

/// Render the canonical form (without the leading `=`).
pub fn canonical_formula(ast: &ASTNode) -> String {
    let mut out = String::new();
    write_node(ast, &mut out);
    out
}

fn write_node(node: &ASTNode, out: &mut String) {
    match &node.node_type {
        ASTNodeType::Number(n) => {
            let _ = write!(out, "{n}");
        }
        ASTNodeType::Reference(pos) => {
            let _ = write!(out, "{pos}");
        }
        ASTNodeType::UnaryOp { op, expr } => {
            out.push(op.symbol());
            write_child(expr, unary_operand_needs_parens(expr), out);
        }
        ASTNodeType::BinaryOp { op, left, right } => {
            write_child(left, child_needs_parens(*op, left, Side::Left), out);
            out.push(op.symbol());
            write_child(right, child_needs_parens(*op, right, Side::Right), out);
        }
    }
}

fn write_child(child: &ASTNode, parenthesize: bool, out: &mut String) {
    if parenthesize {
        out.push('(');
        write_node(child, out);
        out.push(')');
    } else {
        write_node(child, out);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

fn child_needs_parens(parent: BinaryOp, child: &ASTNode, side: Side) -> bool {
    let child_op = match &child.node_type {
        ASTNodeType::BinaryOp { op, .. } => *op,
        ASTNodeType::UnaryOp { .. } => {
            // A bare unary prints as `-x…`; its tail re-binds to the
            // surrounding operator. That is value-preserving everywhere
            // except to the right of `/`, where `a/-b*c` would regroup a
            // division (`a/(-(b*c))` is not `(a/-b)*c`).
            return parent == BinaryOp::Div
                && side == Side::Right
                && unary_tail_is_multiplicative(child);
        }
        _ => return false,
    };
    match parent {
        BinaryOp::Add => false,
        BinaryOp::Sub => side == Side::Right && matches!(child_op, BinaryOp::Add | BinaryOp::Sub),
        BinaryOp::Mul => matches!(child_op, BinaryOp::Add | BinaryOp::Sub),
        BinaryOp::Div => {
            matches!(child_op, BinaryOp::Add | BinaryOp::Sub)
                || (side == Side::Right && matches!(child_op, BinaryOp::Mul | BinaryOp::Div))
        }
    }
}

fn unary_tail_is_multiplicative(node: &ASTNode) -> bool {
    match &node.node_type {
        ASTNodeType::UnaryOp { expr, .. } => match &expr.node_type {
            ASTNodeType::BinaryOp {
                op: BinaryOp::Mul | BinaryOp::Div,
                ..
            } => true,
            ASTNodeType::UnaryOp { .. } => unary_tail_is_multiplicative(expr),
            _ => false,
        },
        _ => false,
    }
}

fn unary_operand_needs_parens(operand: &ASTNode) -> bool {
    // `-(a+b)` must keep its parens; `-(a*b)` re-parses as `(-a)*b`,
    // which is the same value, so it prints bare.
    matches!(
        operand.node_type,
        ASTNodeType::BinaryOp {
            op: BinaryOp::Add | BinaryOp::Sub,
            ..
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn canonical(text: &str) -> String {
        canonical_formula(&parse_formula(text).unwrap())
    }

    #[test]
    fn drops_redundant_parens() {
        assert_eq!(canonical("(1+2)+3"), "1+2+3");
        assert_eq!(canonical("1+(2+3)"), "1+2+3");
        assert_eq!(canonical("(1*2)/3"), "1*2/3");
        assert_eq!(canonical("((A1))"), "A1");
        assert_eq!(canonical("5-(3-2)-(1)"), "5-(3-2)-1");
    }

    #[test]
    fn keeps_required_parens() {
        assert_eq!(canonical("1-(2+3)"), "1-(2+3)");
        assert_eq!(canonical("(1+2)*3"), "(1+2)*3");
        assert_eq!(canonical("1/(2*3)"), "1/(2*3)");
        assert_eq!(canonical("1/(2/3)"), "1/(2/3)");
        assert_eq!(canonical("-(1+A1)"), "-(1+A1)");
    }

    #[test]
    fn unary_over_products_prints_bare() {
        assert_eq!(canonical("-(2*3)"), "-2*3");
        assert_eq!(canonical("-(2/3)"), "-2/3");
        assert_eq!(canonical("--1"), "--1");
        assert_eq!(canonical("1--2"), "1--2");
    }

    #[test]
    fn division_by_signed_product_keeps_parens() {
        assert_eq!(canonical("1/-(2*3)"), "1/(-2*3)");
        assert_eq!(canonical("1/-2"), "1/-2");
        assert_eq!(canonical("1*-(2*3)"), "1*-2*3");
    }

    #[test]
    fn invalid_reference_prints_ref_code() {
        assert_eq!(canonical("AAAA1/5"), "#REF!/5");
    }

    #[test]
    fn printing_is_idempotent() {
        for text in [
            "1+2*3",
            "(1+2)*3",
            "1-(2-3)",
            "1/(2/3)*4",
            "-(1+2)-3",
            "-A1*B2+C3",
            "#REF!+1",
            "1.5e3/2",
        ] {
            let once = canonical(text);
            assert_eq!(canonical(&once), once, "{text}");
        }
    }
}
