//! Cell addressing for the sheet grid.
//!
//! `Position` is an absolute (row, column) address, 0-based internally and
//! rendered in the `A1` convention externally: columns are base-26 letters
//! with no zero digit (`AA` follows `Z`), rows are 1-based decimals. The
//! grid is bounded at 16,384 rows × 16,384 columns; addresses outside that
//! box are represented by the `INVALID` sentinel and print as `#REF!`.

use core::fmt;

use once_cell::sync::Lazy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Exclusive upper bound on 0-based row indices.
pub const MAX_ROWS: u32 = 16_384;
/// Exclusive upper bound on 0-based column indices.
pub const MAX_COLS: u32 = 16_384;

/// Longest column name the grid admits (`XFD` territory needs 3 letters).
const MAX_COL_LETTERS: usize = 3;

// Precomputed names for columns A-ZZ; wider columns fall back to arithmetic.
static COLUMN_NAMES: Lazy<Vec<String>> = Lazy::new(|| {
    let mut names = Vec::with_capacity(26 + 26 * 26);
    for c in b'A'..=b'Z' {
        names.push(String::from(c as char));
    }
    for c1 in b'A'..=b'Z' {
        for c2 in b'A'..=b'Z' {
            names.push(format!("{}{}", c1 as char, c2 as char));
        }
    }
    names
});

/// Absolute grid coordinate, ordered row-major.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

impl Position {
    /// Sentinel for addresses outside the grid. Prints as `#REF!`.
    pub const INVALID: Self = Self {
        row: u32::MAX,
        col: u32::MAX,
    };

    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    #[inline(always)]
    pub fn is_valid(self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Parse an `A1`-style address.
    ///
    /// Accepts exactly `[A-Z]{1,3}[1-9][0-9]*` with the column value at
    /// most 16384 and the row at most 16384; every other input (wrong
    /// shape, lowercase, out of range, overflow) yields `INVALID`.
    pub fn from_a1(s: &str) -> Self {
        let bytes = s.as_bytes();
        let letters = bytes.iter().take_while(|b| b.is_ascii_uppercase()).count();
        if letters == 0 || letters > MAX_COL_LETTERS || letters == bytes.len() {
            return Self::INVALID;
        }
        let digits = &bytes[letters..];
        if digits[0] == b'0' || !digits.iter().all(|b| b.is_ascii_digit()) {
            return Self::INVALID;
        }

        let col = match letters_to_column_index(&s[..letters]) {
            Some(col) if col < MAX_COLS => col,
            _ => return Self::INVALID,
        };
        let row = match s[letters..].parse::<u32>() {
            Ok(row) if row >= 1 && row <= MAX_ROWS => row - 1,
            _ => return Self::INVALID,
        };

        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("#REF!");
        }
        write!(f, "{}{}", column_to_letters(self.col), self.row + 1)
    }
}

/// Convert a 0-based column index to its letter name.
pub fn column_to_letters(col: u32) -> String {
    if let Some(name) = COLUMN_NAMES.get(col as usize) {
        return name.clone();
    }
    let mut col = col;
    let mut buf = Vec::new();
    loop {
        buf.push(b'A' + (col % 26) as u8);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    String::from_utf8(buf).expect("only ASCII A-Z")
}

/// Convert a column letter name to its 0-based index. `None` on anything
/// that is not uppercase ASCII or overflows.
pub fn letters_to_column_index(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for (idx, ch) in s.bytes().enumerate() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        let val = (ch - b'A') as u32;
        col = col.checked_mul(26)?;
        col = col.checked_add(val)?;
        if idx != s.len() - 1 {
            col = col.checked_add(1)?;
        }
    }
    Some(col)
}

/// Dimensions of the printable area: the tight bounding rectangle of
/// non-empty cells, `(0, 0)` when the sheet has none.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Size {
    pub rows: u32,
    pub cols: u32,
}

impl Size {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1_roundtrip() {
        for (text, row, col) in [
            ("A1", 0, 0),
            ("Z1", 0, 25),
            ("AA1", 0, 26),
            ("AB6", 5, 27),
            ("XFD16384", 16_383, 16_383),
        ] {
            let pos = Position::from_a1(text);
            assert_eq!(pos, Position::new(row, col), "{text}");
            assert_eq!(pos.to_string(), text);
        }
    }

    #[test]
    fn a1_rejects_malformed() {
        for text in [
            "", "A", "1", "A0", "a1", "A-1", "A1A", "$A$1", " A1", "A 1", "A01",
        ] {
            assert_eq!(Position::from_a1(text), Position::INVALID, "{text}");
        }
    }

    #[test]
    fn a1_rejects_out_of_range() {
        // One past each limit, and a column needing four letters.
        assert_eq!(Position::from_a1("XFE1"), Position::INVALID);
        assert_eq!(Position::from_a1("A16385"), Position::INVALID);
        assert_eq!(Position::from_a1("AAAA1"), Position::INVALID);
        assert_eq!(Position::from_a1("A99999999999999999999"), Position::INVALID);
    }

    #[test]
    fn invalid_prints_ref() {
        assert!(!Position::INVALID.is_valid());
        assert_eq!(Position::INVALID.to_string(), "#REF!");
    }

    #[test]
    fn ordering_is_row_major() {
        let mut cells = vec![
            Position::new(1, 0),
            Position::new(0, 5),
            Position::new(0, 0),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![
                Position::new(0, 0),
                Position::new(0, 5),
                Position::new(1, 0),
            ]
        );
    }

    #[test]
    fn column_letter_roundtrip() {
        for col in [0, 25, 26, 701, 702, 16_383] {
            let letters = column_to_letters(col);
            assert_eq!(letters_to_column_index(&letters), Some(col));
        }
        assert_eq!(column_to_letters(27), "AB");
        assert!(letters_to_column_index("a1").is_none());
    }
}
