//! The sheet: sparse cell storage plus the reverse-dependency graph.
//!
//! `set_cell` is the central mutation. Its contract is all-or-nothing: a
//! parse failure or a detected cycle leaves the sheet observationally
//! unchanged, with one intentional exception — positions visited during
//! cycle detection are materialized as empty cells and stay that way, so
//! a formula's references become observable the moment they are named.
//!
//! Two invariants the graph code maintains:
//! - every entry `dependents[r] ∋ p` corresponds to a live formula cell
//!   at `p` whose reference list contains `r`;
//! - the forward reference relation is acyclic.

use std::error::Error;
use std::fmt::{self, Display};
use std::io;

use rustc_hash::{FxHashMap, FxHashSet};

use gridcalc_common::{CellValue, FormulaError, Position, Size};
use gridcalc_parse::parser::ParserError;

use crate::engine::cell::{Cell, parse_strict_number};
use crate::traits::ReferenceResolver;

/// Errors surfaced synchronously by sheet operations. Evaluation errors
/// (`#REF!`, `#VALUE!`, `#DIV/0!`) are values, not errors — see
/// `CellValue::Error`.
#[derive(Debug)]
pub enum SheetError {
    /// The address lies outside the grid.
    InvalidPosition(Position),
    /// The input looked like a formula but failed to parse.
    Formula(ParserError),
    /// Committing the write would create a reference cycle.
    CircularDependency(Position),
}

impl Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::InvalidPosition(pos) => {
                write!(f, "invalid position ({}, {})", pos.row, pos.col)
            }
            SheetError::Formula(err) => write!(f, "formula error: {err}"),
            SheetError::CircularDependency(pos) => {
                write!(f, "circular dependency through {pos}")
            }
        }
    }
}

impl Error for SheetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SheetError::Formula(err) => Some(err),
            _ => None,
        }
    }
}

/// A single sheet of cells with memoized formula evaluation.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: FxHashMap<Position, Cell>,
    /// Reverse dependency edges: `dependents[r]` is the set of positions
    /// whose formula references `r`. Keys exist only while non-empty.
    dependents: FxHashMap<Position, FxHashSet<Position>>,
    printable: Size,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn cells(&self) -> &FxHashMap<Position, Cell> {
        &self.cells
    }

    #[cfg(test)]
    pub(crate) fn dependents_map(&self) -> &FxHashMap<Position, FxHashSet<Position>> {
        &self.dependents
    }

    /// Write `text` into the cell at `pos`, parsing it as empty, text or
    /// formula. Rejects writes that would break the sheet: invalid
    /// positions, malformed formulas, and reference cycles.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }

        // Build the replacement off to the side; nothing is committed
        // until both the parse and the cycle check have passed.
        let new_cell = Cell::from_input(text).map_err(SheetError::Formula)?;
        self.check_cycles(pos, new_cell.referenced_cells())?;

        // Commit. The old dependents of `pos` are unchanged by the swap,
        // so invalidating through the current edges reaches exactly the
        // cells whose inputs just moved.
        let old_refs: Vec<Position> = self
            .cells
            .get(&pos)
            .map(|cell| cell.referenced_cells().to_vec())
            .unwrap_or_default();
        for r in old_refs {
            self.remove_dependent(r, pos);
        }
        for &r in new_cell.referenced_cells() {
            if r.is_valid() {
                self.dependents.entry(r).or_default().insert(pos);
            }
        }

        let old_was_filled = self.cells.get(&pos).is_some_and(|c| !c.is_empty());
        let new_is_filled = !new_cell.is_empty();
        self.cells.insert(pos, new_cell);
        self.invalidate_dependents(pos);
        self.update_printable(pos, old_was_filled, new_is_filled);

        #[cfg(feature = "tracing")]
        tracing::trace!(pos = %pos, "cell written");

        Ok(())
    }

    /// The cell at `pos`, if one exists (set explicitly or materialized
    /// by a formula that references it).
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos))
    }

    /// The displayed value at `pos`; absent cells display as empty text.
    pub fn value(&self, pos: Position) -> Result<CellValue, SheetError> {
        Ok(match self.get_cell(pos)? {
            Some(cell) => cell.value(self),
            None => CellValue::Text(String::new()),
        })
    }

    /// The editable text at `pos`; absent cells read as the empty string.
    pub fn text(&self, pos: Position) -> Result<String, SheetError> {
        Ok(match self.get_cell(pos)? {
            Some(cell) => cell.text(),
            None => String::new(),
        })
    }

    /// Remove the cell at `pos`. Incoming dependency edges survive so
    /// that cells referencing `pos` keep tracking it; a later write
    /// reactivates them.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if let Some(cell) = self.cells.remove(&pos) {
            self.invalidate_dependents(pos);
            for &r in cell.referenced_cells() {
                self.remove_dependent(r, pos);
            }
            if !cell.is_empty()
                && (pos.row + 1 == self.printable.rows || pos.col + 1 == self.printable.cols)
            {
                self.rescan_printable();
            }
        }
        Ok(())
    }

    /// Tight bounding rectangle of non-empty cells; `(0, 0)` when none.
    pub fn printable_size(&self) -> Size {
        self.printable
    }

    /// Write cell values over the printable rectangle, tab-separated,
    /// one line per row. Missing and empty cells render as nothing.
    pub fn print_values<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell| cell.value(self).to_string())
    }

    /// Write cell texts over the printable rectangle, tab-separated,
    /// one line per row.
    pub fn print_texts<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |cell| cell.text())
    }

    fn print_with<W: io::Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Cell) -> String,
    ) -> io::Result<()> {
        for row in 0..self.printable.rows {
            for col in 0..self.printable.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    write!(out, "{}", render(cell))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Depth-first walk of the forward reference relation from the new
    /// cell's references, looking for a path back to `target`.
    ///
    /// The new cell is not installed yet, so the cycle through it can only
    /// close by *reaching its position*. Valid referenced positions with
    /// no cell are materialized as empty along the way — that side effect
    /// is part of the contract and survives a detected cycle. The target
    /// itself is never materialized. The visited set bounds the walk on
    /// diamond-shaped graphs.
    fn check_cycles(&mut self, target: Position, refs: &[Position]) -> Result<(), SheetError> {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack: Vec<Position> = refs.iter().copied().filter(|r| r.is_valid()).collect();

        while let Some(p) = stack.pop() {
            if p == target {
                #[cfg(feature = "tracing")]
                tracing::debug!(pos = %target, "rejected write: circular dependency");
                return Err(SheetError::CircularDependency(target));
            }
            if !visited.insert(p) {
                continue;
            }
            let cell = self.cells.entry(p).or_insert(Cell::Empty);
            stack.extend(cell.referenced_cells().iter().copied().filter(|r| r.is_valid()));
        }
        Ok(())
    }

    /// Clear the memoized value of every cell transitively reachable from
    /// `pos` through the reverse-dependency edges. The visited set is
    /// required for termination on diamond shapes.
    fn invalidate_dependents(&self, pos: Position) {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut stack: Vec<Position> = self.dependents_of(pos).collect();

        while let Some(p) = stack.pop() {
            if !visited.insert(p) {
                continue;
            }
            if let Some(cell) = self.cells.get(&p) {
                debug_assert!(
                    matches!(cell, Cell::Formula(_)),
                    "dependency edge points at a non-formula cell at {p}"
                );
                cell.invalidate_cache();
            }
            stack.extend(self.dependents_of(p));
        }
    }

    fn dependents_of(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        self.dependents.get(&pos).into_iter().flatten().copied()
    }

    fn remove_dependent(&mut self, referenced: Position, dependent: Position) {
        if let Some(set) = self.dependents.get_mut(&referenced) {
            set.remove(&dependent);
            if set.is_empty() {
                self.dependents.remove(&referenced);
            }
        }
    }

    fn update_printable(&mut self, pos: Position, old_was_filled: bool, new_is_filled: bool) {
        if new_is_filled {
            self.printable.rows = self.printable.rows.max(pos.row + 1);
            self.printable.cols = self.printable.cols.max(pos.col + 1);
        } else if old_was_filled
            && (pos.row + 1 == self.printable.rows || pos.col + 1 == self.printable.cols)
        {
            self.rescan_printable();
        }
    }

    fn rescan_printable(&mut self) {
        let mut size = Size::default();
        for (pos, cell) in &self.cells {
            if !cell.is_empty() {
                size.rows = size.rows.max(pos.row + 1);
                size.cols = size.cols.max(pos.col + 1);
            }
        }
        self.printable = size;
    }
}

impl ReferenceResolver for Sheet {
    /// How a formula sees a referenced cell: absent and empty cells are
    /// `0.0`, numbers pass through, displayed text goes through the strict
    /// decimal grammar, and stored error values re-raise themselves.
    fn resolve_cell_number(&self, pos: Position) -> Result<f64, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        let Some(cell) = self.cells.get(&pos) else {
            return Ok(0.0);
        };
        if cell.is_empty() {
            return Ok(0.0);
        }
        match cell.value(self) {
            CellValue::Number(x) => Ok(x),
            CellValue::Text(text) => parse_strict_number(&text).ok_or(FormulaError::Value),
            CellValue::Error(e) => Err(e),
        }
    }
}
