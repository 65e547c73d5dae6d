//! Structural invariants of the reverse-dependency map.

use gridcalc_common::Position;

use crate::engine::{Cell, Sheet};

fn at(s: &str) -> Position {
    Position::from_a1(s)
}

/// Invariant: `dependents[r] ∋ p` iff the cell at `p` is a formula whose
/// reference list contains `r`, for every valid `r`.
fn assert_dependency_symmetry(sheet: &Sheet) {
    for (r, dependents) in sheet.dependents_map() {
        for p in dependents {
            match sheet.cells().get(p) {
                Some(cell @ Cell::Formula(_)) => {
                    assert!(
                        cell.referenced_cells().contains(r),
                        "edge {r} -> {p} has no matching reference"
                    );
                }
                _ => panic!("edge {r} -> {p} points at a non-formula cell"),
            }
        }
    }
    for (p, cell) in sheet.cells() {
        for r in cell.referenced_cells() {
            if !r.is_valid() {
                continue;
            }
            assert!(
                sheet.dependents_map().get(r).is_some_and(|set| set.contains(p)),
                "reference {p} -> {r} has no reverse edge"
            );
        }
    }
}

#[test]
fn edges_mirror_references_after_writes() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "=B1+C1").unwrap();
    sheet.set_cell(at("B1"), "=C1*2").unwrap();
    sheet.set_cell(at("C1"), "1").unwrap();
    assert_dependency_symmetry(&sheet);

    // Repoint B1 away from C1.
    sheet.set_cell(at("B1"), "=D1").unwrap();
    assert_dependency_symmetry(&sheet);

    // Downgrade A1 from formula to text.
    sheet.set_cell(at("A1"), "plain").unwrap();
    assert_dependency_symmetry(&sheet);
}

#[test]
fn clearing_prunes_outgoing_edges_only() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "=B1").unwrap();
    sheet.set_cell(at("B1"), "=C1").unwrap();

    sheet.clear_cell(at("B1")).unwrap();
    assert_dependency_symmetry(&sheet);

    // B1's own reference to C1 is gone, so C1 has no dependents left...
    assert!(!sheet.dependents_map().contains_key(&at("C1")));
    // ...but A1 still watches B1 for a future write.
    assert!(sheet.dependents_map()[&at("B1")].contains(&at("A1")));
}

#[test]
fn failed_writes_leave_the_graph_untouched() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "=B1").unwrap();
    sheet.set_cell(at("B1"), "=C1").unwrap();

    let _ = sheet.set_cell(at("C1"), "=A1").unwrap_err();
    assert_dependency_symmetry(&sheet);
    assert!(!sheet.dependents_map().contains_key(&at("A1")));
}

#[test]
fn invalid_references_get_no_edges() {
    let mut sheet = Sheet::new();
    sheet.set_cell(at("A1"), "=AAAA1+B1").unwrap();
    assert_dependency_symmetry(&sheet);

    // Only the valid reference produced an edge.
    assert_eq!(sheet.dependents_map().len(), 1);
    assert!(sheet.dependents_map()[&at("B1")].contains(&at("A1")));
}
