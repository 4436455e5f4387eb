//! Consistency cross-check between the two aggregation paths.
//!
//! The same monetary data is computed twice: per-file accumulation during
//! extraction, and an independent re-scan of the persisted CSV. Divergence
//! beyond the tolerance signals a classification or extraction defect; it
//! is reported, never retried or raised.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::payroll::unifier::aggregate::{self, AggregateOutcome, CategorySums};
use crate::payroll::unifier::error::Result;
use crate::payroll::unifier::io::csv_store;
use crate::payroll::unifier::model::EntityKind;
use crate::payroll::unifier::period::Period;

/// Default divergence tolerance, in currency units.
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// One category compared across the two aggregation paths.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCheck {
    pub category: &'static str,
    pub csv: f64,
    pub accumulated: f64,
    pub divergence: f64,
    pub significant: bool,
}

/// Outcome of a per-period consistency verification.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub period: String,
    pub tolerance: f64,
    pub consistent: bool,
    /// Sum of the per-category divergences, significant or not.
    pub total_divergence: f64,
    pub checks: Vec<CategoryCheck>,
    /// Rows of the CSV too short to take part in the sums.
    pub skipped_rows: usize,
}

/// Recomputes category sums from a persisted extract, using the same
/// formulas as the in-memory aggregation.
pub fn sums_from_csv(path: &Path) -> Result<AggregateOutcome> {
    let rows = csv_store::read_rows(path)?;
    Ok(aggregate::sum_categories(rows.iter().map(Vec::as_slice)))
}

/// Verifies that the CSV at `csv_path` agrees with the per-entity sums
/// accumulated during extraction.
///
/// The accumulated side sums every entity kind except [`EntityKind::Other`].
/// Each of the six keys (five categories plus total) is compared; a
/// divergence above `tolerance` marks the period inconsistent.
pub fn verify(
    period: Period,
    by_entity: &BTreeMap<EntityKind, CategorySums>,
    csv_path: &Path,
    tolerance: f64,
) -> Result<ReconciliationReport> {
    let csv_outcome = sums_from_csv(csv_path)?;

    let mut accumulated = CategorySums::default();
    for (kind, sums) in by_entity {
        if *kind != EntityKind::Other {
            accumulated += *sums;
        }
    }

    let mut checks = Vec::with_capacity(6);
    let mut consistent = true;
    let mut total_divergence = 0.0;

    let csv_entries = csv_outcome.sums.entries();
    let accumulated_entries = accumulated.entries();
    for ((category, csv_value), (_, accumulated_value)) in
        csv_entries.into_iter().zip(accumulated_entries)
    {
        let divergence = (csv_value - accumulated_value).abs();
        let significant = divergence > tolerance;
        if significant {
            consistent = false;
            warn!(
                period = %period,
                category,
                csv = csv_value,
                accumulated = accumulated_value,
                divergence,
                "significant divergence between aggregation paths"
            );
        }
        total_divergence += divergence;
        checks.push(CategoryCheck {
            category,
            csv: csv_value,
            accumulated: accumulated_value,
            divergence,
            significant,
        });
    }

    info!(
        period = %period,
        consistent,
        total_divergence,
        skipped_rows = csv_outcome.skipped,
        "reconciliation finished"
    );

    Ok(ReconciliationReport {
        period: period.sheet_name(),
        tolerance,
        consistent,
        total_divergence,
        checks,
        skipped_rows: csv_outcome.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::unifier::aggregate::sum_categories;
    use crate::payroll::unifier::model::{EXTRACTED_FIELDS, Record};

    fn record(personal: &str, employer: &str) -> Record {
        let mut cells = vec![String::new(); EXTRACTED_FIELDS];
        cells[0] = "27000111222".to_string();
        cells[8] = personal.to_string();
        cells[22] = employer.to_string();
        Record::from_extracted(cells, "40")
    }

    fn sums(records: &[Record]) -> CategorySums {
        sum_categories(records.iter().map(Record::fields)).sums
    }

    #[test]
    fn matching_paths_report_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.csv");
        let records = vec![record("100.00", "40.00"), record("50.00", "20.00")];
        csv_store::write_fresh(&path, &records).unwrap();

        let mut by_entity = BTreeMap::new();
        by_entity.insert(EntityKind::Municipality, sums(&records));

        let report = verify(Period::Month(6), &by_entity, &path, DEFAULT_TOLERANCE).unwrap();
        assert!(report.consistent);
        assert!(report.total_divergence < 0.01);
        assert_eq!(report.checks.len(), 6);
    }

    #[test]
    fn missing_accumulation_is_flagged_as_divergent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.csv");
        let records = vec![record("500.00", "0.00")];
        csv_store::write_fresh(&path, &records).unwrap();

        // Nothing accumulated: the whole CSV value diverges.
        let by_entity = BTreeMap::new();
        let report = verify(Period::Month(6), &by_entity, &path, DEFAULT_TOLERANCE).unwrap();

        assert!(!report.consistent);
        let personal = &report.checks[0];
        assert_eq!(personal.category, "personal");
        assert!(personal.significant);
        assert_eq!(personal.divergence, 500.00);
        // personal + total both diverge by 500.
        assert_eq!(report.total_divergence, 1000.00);
    }

    #[test]
    fn other_entities_are_excluded_from_the_accumulated_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.csv");
        let records = vec![record("10.00", "0.00")];
        csv_store::write_fresh(&path, &records).unwrap();

        let mut by_entity = BTreeMap::new();
        by_entity.insert(EntityKind::Municipality, sums(&records));
        // An extra bucket under Other must not change the accumulated side.
        by_entity.insert(EntityKind::Other, sums(&records));

        let report = verify(Period::Month(6), &by_entity, &path, DEFAULT_TOLERANCE).unwrap();
        assert!(report.consistent);
    }

    #[test]
    fn divergence_within_tolerance_stays_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.csv");
        let records = vec![record("100.50", "0.00")];
        csv_store::write_fresh(&path, &records).unwrap();

        let mut by_entity = BTreeMap::new();
        by_entity.insert(EntityKind::Commune, sums(&[record("100.00", "0.00")]));

        let report = verify(Period::Month(6), &by_entity, &path, DEFAULT_TOLERANCE).unwrap();
        assert!(report.consistent, "0.50 is under the 1.00 tolerance");
        assert!(report.total_divergence > 0.0);
    }
}
