//! Rights conservation: a reallocation may move value between the offers
//! it touches but never create or destroy it.
//!
//! Totals are taken per assay over the touched offers only. Offers outside
//! the reallocation keep their extents, so conserving the touched totals
//! conserves each assay's global total.

use crate::error::ZoeError;
use std::rc::Rc;
use zoe_ertp::{Extent, ExtentOps};

/// Why a proposed matrix fails conservation, or `None` if it conserves.
///
/// `previous` and `proposed` have one row per offer and one column per
/// assay. A proposed column that cannot even be summed (two holders of the
/// same unique item) is reported as a violation, not an error.
pub fn conservation_violation(
    extent_ops: &[Rc<dyn ExtentOps>],
    previous: &[Vec<Extent>],
    proposed: &[Vec<Extent>],
) -> Result<Option<String>, ZoeError> {
    if previous.len() != proposed.len() {
        return Err(ZoeError::MalformedReallocation(format!(
            "{} current rows but {} proposed rows",
            previous.len(),
            proposed.len()
        )));
    }
    for row in previous.iter().chain(proposed) {
        if row.len() != extent_ops.len() {
            return Err(ZoeError::MalformedReallocation(format!(
                "row has {} extents, expected one per assay ({})",
                row.len(),
                extent_ops.len()
            )));
        }
    }

    for (column, ops) in extent_ops.iter().enumerate() {
        let before = column_total(ops.as_ref(), previous, column)?;
        let after = match column_total(ops.as_ref(), proposed, column) {
            Ok(total) => total,
            Err(err) => return Ok(Some(format!("assay {column}: {err}"))),
        };
        if !ops.equals(&before, &after)? {
            return Ok(Some(format!("assay {column}: total {before} became {after}")));
        }
    }
    Ok(None)
}

/// Whether per-assay totals are identical before and after.
pub fn are_rights_conserved(
    extent_ops: &[Rc<dyn ExtentOps>],
    previous: &[Vec<Extent>],
    proposed: &[Vec<Extent>],
) -> Result<bool, ZoeError> {
    Ok(conservation_violation(extent_ops, previous, proposed)?.is_none())
}

fn column_total(
    ops: &dyn ExtentOps,
    rows: &[Vec<Extent>],
    column: usize,
) -> Result<Extent, zoe_ertp::ExtentError> {
    rows.iter()
        .try_fold(ops.empty(), |total, row| ops.with(&total, &row[column]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zoe_ertp::{CollectionExtentOps, NatExtentOps, UniExtentOps};

    fn nat_ops(n: usize) -> Vec<Rc<dyn ExtentOps>> {
        (0..n)
            .map(|_| Rc::new(NatExtentOps) as Rc<dyn ExtentOps>)
            .collect()
    }

    fn rows(values: &[&[u64]]) -> Vec<Vec<Extent>> {
        values
            .iter()
            .map(|row| row.iter().copied().map(Extent::Nat).collect())
            .collect()
    }

    #[test]
    fn matching_column_sums_are_conserved() {
        let ops = nat_ops(2);
        let before = rows(&[&[3, 0], &[0, 7]]);
        let after = rows(&[&[0, 7], &[3, 0]]);
        assert!(are_rights_conserved(&ops, &before, &after).unwrap());
    }

    #[test]
    fn changed_column_sum_is_reported() {
        let ops = nat_ops(2);
        let before = rows(&[&[3, 0], &[0, 7]]);
        let after = rows(&[&[0, 7], &[4, 0]]);
        assert_eq!(
            conservation_violation(&ops, &before, &after).unwrap(),
            Some("assay 0: total 3 became 4".to_string())
        );
    }

    #[test]
    fn swapping_columns_is_not_conservation() {
        let ops = nat_ops(2);
        let before = rows(&[&[3, 4]]);
        let after = rows(&[&[4, 3]]);
        assert!(!are_rights_conserved(&ops, &before, &after).unwrap());
    }

    #[test]
    fn duplicating_a_unique_item_is_a_violation() {
        let ops: Vec<Rc<dyn ExtentOps>> = vec![Rc::new(UniExtentOps::new())];
        let seat = Extent::Uni(Some(json!({"seat": 1})));
        let before = vec![vec![seat.clone()], vec![Extent::Uni(None)]];
        let after = vec![vec![seat.clone()], vec![seat]];
        let reason = conservation_violation(&ops, &before, &after).unwrap().unwrap();
        assert!(reason.starts_with("assay 0:"));
    }

    #[test]
    fn collections_may_move_but_not_multiply() {
        let ops: Vec<Rc<dyn ExtentOps>> = vec![Rc::new(CollectionExtentOps)];
        let before = vec![
            vec![Extent::Collection(vec![json!("a"), json!("b")])],
            vec![Extent::Collection(vec![])],
        ];
        let moved = vec![
            vec![Extent::Collection(vec![json!("b")])],
            vec![Extent::Collection(vec![json!("a")])],
        ];
        assert!(are_rights_conserved(&ops, &before, &moved).unwrap());
        let copied = vec![
            vec![Extent::Collection(vec![json!("a"), json!("b")])],
            vec![Extent::Collection(vec![json!("a")])],
        ];
        assert!(!are_rights_conserved(&ops, &before, &copied).unwrap());
    }

    #[test]
    fn ragged_matrices_are_malformed() {
        let ops = nat_ops(2);
        assert!(matches!(
            are_rights_conserved(&ops, &rows(&[&[1, 2]]), &rows(&[&[3]])),
            Err(ZoeError::MalformedReallocation(_))
        ));
        assert!(matches!(
            are_rights_conserved(&ops, &rows(&[&[1, 2]]), &rows(&[])),
            Err(ZoeError::MalformedReallocation(_))
        ));
    }
}
