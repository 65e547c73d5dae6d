//! Cell storage: one of empty, text, or formula.
//!
//! A sum type dispatched by match; each variant keeps only what it
//! needs. A formula cell owns its parsed AST, the deduplicated reference
//! list, and a memoized value behind a `RefCell` so evaluation can cache
//! through a shared sheet borrow.

use std::cell::RefCell;

use gridcalc_common::{CellValue, FormulaError, Position};
use gridcalc_parse::parser::{ASTNode, ParserError, parse_formula};
use gridcalc_parse::pretty::canonical_formula;

use crate::interpreter::Interpreter;
use crate::traits::ReferenceResolver;

/// Leading character that marks a formula.
pub const FORMULA_SIGN: char = '=';
/// Leading character that escapes text (one is stripped for display).
pub const ESCAPE_SIGN: char = '\'';

/// A formula cell: the parsed tree plus cached evaluation state.
#[derive(Debug)]
pub struct FormulaCell {
    ast: ASTNode,
    /// Referenced positions, sorted and deduplicated; invalid positions
    /// are kept and surface as `#REF!` at evaluation.
    refs: Vec<Position>,
    cache: RefCell<Option<CellValue>>,
}

impl FormulaCell {
    fn new(ast: ASTNode) -> Self {
        let mut refs = ast.referenced_cells();
        refs.sort_unstable();
        refs.dedup();
        Self {
            ast,
            refs,
            cache: RefCell::new(None),
        }
    }
}

/// The contents of one sheet slot.
#[derive(Debug)]
pub enum Cell {
    Empty,
    Text(String),
    Formula(FormulaCell),
}

impl Cell {
    /// Classify raw input and build the matching variant.
    ///
    /// The empty string is an empty cell; anything not starting with `=`
    /// (or exactly `"="`) is text, escape character included; everything
    /// else parses as a formula. Construction is all-or-nothing — a parse
    /// failure leaves no partially built cell behind.
    pub fn from_input(text: &str) -> Result<Self, ParserError> {
        if text.is_empty() {
            return Ok(Cell::Empty);
        }
        if !text.starts_with(FORMULA_SIGN) || text.len() == FORMULA_SIGN.len_utf8() {
            return Ok(Cell::Text(text.to_string()));
        }
        let ast = parse_formula(&text[FORMULA_SIGN.len_utf8()..])?;
        Ok(Cell::Formula(FormulaCell::new(ast)))
    }

    /// The value this cell presents: empty text, display text with one
    /// escape stripped, or the (memoized) formula result. A finite result
    /// is a number; a non-finite one is `#DIV/0!`; evaluation errors come
    /// back as values.
    pub fn value(&self, resolver: &dyn ReferenceResolver) -> CellValue {
        match self {
            Cell::Empty => CellValue::Text(String::new()),
            Cell::Text(raw) => {
                if let Some(stripped) = raw.strip_prefix(ESCAPE_SIGN) {
                    CellValue::Text(stripped.to_string())
                } else {
                    CellValue::Text(raw.clone())
                }
            }
            Cell::Formula(formula) => {
                if let Some(cached) = formula.cache.borrow().as_ref() {
                    return cached.clone();
                }
                let value = match Interpreter::new(resolver).evaluate(&formula.ast) {
                    Ok(x) if x.is_finite() => CellValue::Number(x),
                    Ok(_) => CellValue::Error(FormulaError::Div),
                    Err(e) => CellValue::Error(e),
                };
                *formula.cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// The raw text as the user would edit it: formulas come back in
    /// canonical form, escaped text keeps its escape.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(raw) => raw.clone(),
            Cell::Formula(formula) => format!("{}{}", FORMULA_SIGN, canonical_formula(&formula.ast)),
        }
    }

    /// Sorted, deduplicated referenced positions (empty for non-formulas).
    pub fn referenced_cells(&self) -> &[Position] {
        match self {
            Cell::Formula(formula) => &formula.refs,
            _ => &[],
        }
    }

    /// Drop the memoized value. No-op for non-formula cells.
    pub fn invalidate_cache(&self) {
        if let Cell::Formula(formula) = self {
            formula.cache.borrow_mut().take();
        }
    }

    /// Whether a memoized value is present. Non-formula cells are always
    /// considered cached — their value never goes stale.
    pub fn is_cached(&self) -> bool {
        match self {
            Cell::Formula(formula) => formula.cache.borrow().is_some(),
            _ => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Strict decimal grammar for treating displayed text as a number:
/// optional sign, digits, optional fractional part, optional exponent.
/// Returns `None` for anything else (so `1.2.3`, `1e`, `` and ` 5 ` are
/// all non-numeric).
pub(crate) fn parse_strict_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
        pos += 1;
    }
    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == int_start {
        return None;
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
            return None;
        }
    }
    if pos != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok().filter(|x| x.is_finite())
}
