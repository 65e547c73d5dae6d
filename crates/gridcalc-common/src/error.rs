//! Formula evaluation errors.
//!
//! These are the error *values* a formula can produce — they travel inside
//! `CellValue::Error`, not through `Result` chains at the sheet surface.
//! `Display` renders them exactly as the sheet prints them.

use std::{error::Error, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The recognised formula error codes. Equality is on kind.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FormulaError {
    /// A reference to an address outside the grid.
    Ref,
    /// Non-numeric text used as an arithmetic operand.
    Value,
    /// Division by zero, or any non-finite arithmetic result.
    Div,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ref => "#REF!",
            Self::Value => "#VALUE!",
            Self::Div => "#DIV/0!",
        })
    }
}

impl Error for FormulaError {}
