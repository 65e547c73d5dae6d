//! gridcalc-eval – core traits (object-safe)

use gridcalc_common::{FormulaError, Position};

/// The lookup seam between formula evaluation and cell storage.
///
/// Implementations resolve a referenced position to the number a formula
/// arithmetic operand sees, or to the formula error the reference carries:
/// missing and empty cells resolve to `0.0`, text resolves through the
/// strict numeric grammar or fails with `Value`, and error values
/// propagate as themselves. Resolution must not mutate the sheet.
pub trait ReferenceResolver {
    fn resolve_cell_number(&self, pos: Position) -> Result<f64, FormulaError>;
}

impl<F> ReferenceResolver for F
where
    F: Fn(Position) -> Result<f64, FormulaError>,
{
    fn resolve_cell_number(&self, pos: Position) -> Result<f64, FormulaError> {
        self(pos)
    }
}
