//! Meta crate that re-exports the gridcalc building blocks. Downstream
//! users can depend on this crate and opt into specific layers via
//! feature flags while keeping access to the underlying crates when
//! deeper integration is required.

pub use gridcalc_common as common;

#[cfg(feature = "parse")]
pub use gridcalc_parse as parse;

#[cfg(feature = "eval")]
pub use gridcalc_eval as eval;

pub use gridcalc_common::{CellValue, FormulaError, Position, Size};

#[cfg(feature = "eval")]
pub use gridcalc_eval::{Cell, Sheet, SheetError};
