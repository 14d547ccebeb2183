//! Update-vs-insert reconciliation of validated rows against the existing
//! catalog scope.
//!
//! The rule is identifier-based only: a row that carries the fingerprint of
//! an existing entry is an update that fully replaces that entry's fields; a
//! row without a resolvable identifier is always an insert, however similar
//! its content looks. Content-based fuzzy matching is deliberately absent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::entry::CatalogEntry;
use crate::core::rate::RateTest;
use crate::core::types::ServiceCategory;
use crate::parsing::rows::RateRow;

/// Counts reported back to the uploader. All-zero with no errors is a valid
/// "nothing changed" outcome, not a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub updated: usize,
    pub inserted: usize,
    pub rows_with_errors: usize,
}

/// Everything the version manager needs to commit one upload.
#[derive(Debug, Clone)]
pub struct Changeset {
    /// One upserted entry per row, in sheet order.
    pub entries: Vec<CatalogEntry>,
    /// One rate test per row, in sheet order.
    pub tests: Vec<RateTest>,
    /// Fingerprints belonging to the new version, in sheet order.
    pub catalog_ids: Vec<String>,
    pub summary: ReconcileSummary,
}

fn entry_from_row(row: &RateRow, service: ServiceCategory, service_id: &str) -> CatalogEntry {
    let tat_days = row
        .tat_days
        .and_then(|d| u32::try_from(d).ok())
        .map(|d| d.max(1));
    CatalogEntry {
        service_id: service_id.to_string(),
        service_name: service.display_name().to_string(),
        group: row.group.clone(),
        test_name: row.test_name.clone(),
        printable_text: row.printable_text.clone(),
        method: row.method.clone(),
        unit: row.unit.clone(),
        tat_days,
        accreditation_status: row.accreditation,
        department: row.department.clone(),
        fingerprint: CatalogEntry::fingerprint_of(
            service_id,
            row.group.as_deref(),
            &row.test_name,
            row.unit.as_deref(),
        ),
    }
}

fn test_from_row(row: &RateRow) -> RateTest {
    let tat = row
        .tat_days
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(1);
    RateTest::new(row.test_name.clone(), row.rate, tat)
        .with_parameters(row.parameters.clone())
        .with_unit(row.unit.clone())
}

/// Classify each validated row as update or insert against the existing
/// entries for this service scope, producing the changeset for the new
/// version.
///
/// Updates and inserts have no ordering dependency on each other; both
/// produce a fresh entry whose fingerprint reflects the row's (possibly
/// changed) identity fields. An identity-changing update appends under its
/// new fingerprint; the superseded entry is left in place because older
/// version snapshots still reference it.
#[must_use]
pub fn reconcile(
    rows: &[RateRow],
    scope: &[CatalogEntry],
    service: ServiceCategory,
    service_id: &str,
    rows_with_errors: usize,
) -> Changeset {
    let existing: HashMap<&str, &CatalogEntry> = scope
        .iter()
        .map(|e| (e.fingerprint.as_str(), e))
        .collect();

    let mut summary = ReconcileSummary {
        rows_with_errors,
        ..ReconcileSummary::default()
    };
    let mut entries = Vec::with_capacity(rows.len());
    let mut tests = Vec::with_capacity(rows.len());
    let mut catalog_ids = Vec::with_capacity(rows.len());

    for row in rows {
        let entry = entry_from_row(row, service, service_id);
        let matched = row
            .id
            .as_deref()
            .map(str::trim)
            .is_some_and(|id| existing.contains_key(id));

        if matched {
            summary.updated += 1;
        } else {
            summary.inserted += 1;
        }

        catalog_ids.push(entry.fingerprint.clone());
        tests.push(test_from_row(row));
        entries.push(entry);
    }

    Changeset {
        entries,
        tests,
        catalog_ids,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<&str>, group: &str, name: &str, rate: f64) -> RateRow {
        RateRow {
            id: id.map(str::to_string),
            group: Some(group.to_string()),
            test_name: name.to_string(),
            printable_text: None,
            method: None,
            unit: Some("mg/L".to_string()),
            rate,
            tat_days: Some(3),
            accreditation: None,
            department: None,
            parameters: vec![],
        }
    }

    fn scope_of(rows: &[RateRow]) -> Vec<CatalogEntry> {
        rows.iter()
            .map(|r| entry_from_row(r, ServiceCategory::WaterTesting, "water-testing"))
            .collect()
    }

    #[test]
    fn test_rows_without_id_always_insert() {
        let existing = scope_of(&[row(None, "Metals", "Lead", 350.0)]);
        // Identical content, but no identifier carried forward.
        let rows = vec![row(None, "Metals", "Lead", 350.0)];
        let cs = reconcile(&rows, &existing, ServiceCategory::WaterTesting, "water-testing", 0);
        assert_eq!(cs.summary.inserted, 1);
        assert_eq!(cs.summary.updated, 0);
    }

    #[test]
    fn test_reupload_with_identifiers_updates_everything() {
        let existing = scope_of(&[
            row(None, "Metals", "Lead", 350.0),
            row(None, "Metals", "Cadmium", 420.0),
        ]);
        let rows: Vec<RateRow> = existing
            .iter()
            .map(|e| row(Some(&e.fingerprint), "Metals", &e.test_name, 999.0))
            .collect();
        let cs = reconcile(&rows, &existing, ServiceCategory::WaterTesting, "water-testing", 0);
        assert_eq!(cs.summary.updated, 2);
        assert_eq!(cs.summary.inserted, 0);
        // Update replaces fields wholesale; price change visible in tests.
        assert!(cs.tests.iter().all(|t| t.price == 999.0));
    }

    #[test]
    fn test_update_with_changed_identity_gets_a_fresh_fingerprint() {
        let existing = scope_of(&[row(None, "Metals", "Lead", 350.0)]);
        let old_id = existing[0].fingerprint.clone();
        let rows = vec![row(Some(&old_id), "Heavy Metals", "Lead", 350.0)];
        let cs = reconcile(&rows, &existing, ServiceCategory::WaterTesting, "water-testing", 0);
        assert_eq!(cs.summary.updated, 1);
        // The new version references the new identity only; the superseded
        // entry stays in the per-service collection for older snapshots.
        assert_ne!(cs.entries[0].fingerprint, old_id);
        assert_eq!(cs.catalog_ids, vec![cs.entries[0].fingerprint.clone()]);
    }

    #[test]
    fn test_unknown_identifier_falls_back_to_insert() {
        let existing = scope_of(&[row(None, "Metals", "Lead", 350.0)]);
        let rows = vec![row(Some("deadbeef"), "Metals", "Zinc", 150.0)];
        let cs = reconcile(&rows, &existing, ServiceCategory::WaterTesting, "water-testing", 0);
        assert_eq!(cs.summary.inserted, 1);
        assert_eq!(cs.summary.updated, 0);
    }

    #[test]
    fn test_empty_upload_is_a_valid_nothing_changed_outcome() {
        let cs = reconcile(&[], &[], ServiceCategory::WaterTesting, "water-testing", 0);
        assert_eq!(cs.summary, ReconcileSummary::default());
        assert!(cs.tests.is_empty());
    }

    #[test]
    fn test_tat_days_clamped_into_tests() {
        let mut r = row(None, "Metals", "Lead", 350.0);
        r.tat_days = Some(0);
        let cs = reconcile(&[r], &[], ServiceCategory::WaterTesting, "water-testing", 0);
        assert_eq!(cs.tests[0].tat_days, 1);
    }
}
