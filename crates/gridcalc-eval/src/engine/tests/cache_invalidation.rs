//! Memoization and transitive invalidation through the reverse edges.

use gridcalc_common::{CellValue, Position};

use crate::engine::Sheet;

fn at(s: &str) -> Position {
    Position::from_a1(s)
}

fn is_cached(sheet: &Sheet, pos: &str) -> bool {
    sheet.get_cell(at(pos)).unwrap().unwrap().is_cached()
}

#[test]
fn evaluation_populates_the_cache() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "=1+1").unwrap();

    assert!(!is_cached(&sheet, "A1"));
    sheet.value(at("A1")).unwrap();
    assert!(is_cached(&sheet, "A1"));
}

#[test]
fn chain_invalidation_reaches_all_dependents() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "10").unwrap();
    sheet.set_cell(at("A2"), "=A1").unwrap();
    sheet.set_cell(at("A3"), "=A2").unwrap();
    sheet.set_cell(at("A4"), "=A3").unwrap();

    assert_eq!(sheet.value(at("A4")).unwrap(), CellValue::Number(10.0));
    assert!(is_cached(&sheet, "A2"));
    assert!(is_cached(&sheet, "A3"));
    assert!(is_cached(&sheet, "A4"));

    sheet.set_cell(at("A1"), "20").unwrap();
    assert!(!is_cached(&sheet, "A2"));
    assert!(!is_cached(&sheet, "A3"));
    assert!(!is_cached(&sheet, "A4"));
    assert_eq!(sheet.value(at("A4")).unwrap(), CellValue::Number(20.0));
}

#[test]
fn diamond_invalidation_visits_each_cell_once() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "1").unwrap();
    sheet.set_cell(at("B1"), "=A1").unwrap();
    sheet.set_cell(at("B2"), "=A1").unwrap();
    sheet.set_cell(at("C1"), "=B1+B2").unwrap();

    assert_eq!(sheet.value(at("C1")).unwrap(), CellValue::Number(2.0));

    sheet.set_cell(at("A1"), "3").unwrap();
    assert!(!is_cached(&sheet, "B1"));
    assert!(!is_cached(&sheet, "B2"));
    assert!(!is_cached(&sheet, "C1"));
    assert_eq!(sheet.value(at("C1")).unwrap(), CellValue::Number(6.0));
}

#[test]
fn unrelated_caches_are_left_alone() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "1").unwrap();
    sheet.set_cell(at("B1"), "=A1").unwrap();
    sheet.set_cell(at("D4"), "=2*2").unwrap();

    sheet.value(at("B1")).unwrap();
    sheet.value(at("D4")).unwrap();

    sheet.set_cell(at("A1"), "2").unwrap();
    assert!(!is_cached(&sheet, "B1"));
    assert!(is_cached(&sheet, "D4"));
}

#[test]
fn clearing_a_cell_invalidates_its_dependents() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "7").unwrap();
    sheet.set_cell(at("B1"), "=A1").unwrap();
    assert_eq!(sheet.value(at("B1")).unwrap(), CellValue::Number(7.0));

    sheet.clear_cell(at("A1")).unwrap();
    assert!(!is_cached(&sheet, "B1"));
    // A cleared upstream cell reads as 0.0.
    assert_eq!(sheet.value(at("B1")).unwrap(), CellValue::Number(0.0));
}

#[test]
fn dependents_survive_clear_and_reactivate() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "=B1").unwrap();
    sheet.set_cell(at("B1"), "1").unwrap();
    assert_eq!(sheet.value(at("A1")).unwrap(), CellValue::Number(1.0));

    sheet.clear_cell(at("B1")).unwrap();
    assert_eq!(sheet.value(at("A1")).unwrap(), CellValue::Number(0.0));

    // The reverse edge survived the clear; the new write invalidates A1.
    sheet.set_cell(at("B1"), "9").unwrap();
    assert!(!is_cached(&sheet, "A1"));
    assert_eq!(sheet.value(at("A1")).unwrap(), CellValue::Number(9.0));
}

#[test]
fn rewriting_a_formula_drops_stale_edges() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "1").unwrap();
    sheet.set_cell(at("B1"), "2").unwrap();
    sheet.set_cell(at("C1"), "=A1").unwrap();
    sheet.value(at("C1")).unwrap();

    // Repoint C1 from A1 to B1; writes to A1 must no longer touch it.
    sheet.set_cell(at("C1"), "=B1").unwrap();
    sheet.value(at("C1")).unwrap();
    sheet.set_cell(at("A1"), "100").unwrap();
    assert!(is_cached(&sheet, "C1"));

    sheet.set_cell(at("B1"), "5").unwrap();
    assert!(!is_cached(&sheet, "C1"));
    assert_eq!(sheet.value(at("C1")).unwrap(), CellValue::Number(5.0));
}

#[test]
fn error_values_are_cached_and_invalidated_too() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "0").unwrap();
    sheet.set_cell(at("B1"), "=1/A1").unwrap();

    assert_eq!(
        sheet.value(at("B1")).unwrap(),
        CellValue::Error(gridcalc_common::FormulaError::Div)
    );
    assert!(is_cached(&sheet, "B1"));

    sheet.set_cell(at("A1"), "4").unwrap();
    assert!(!is_cached(&sheet, "B1"));
    assert_eq!(sheet.value(at("B1")).unwrap(), CellValue::Number(0.25));
}
