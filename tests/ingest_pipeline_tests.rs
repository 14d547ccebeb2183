//! End-to-end ingestion pipeline tests
//!
//! These drive the library exactly the way the CLI and web layers do: raw
//! spreadsheet bytes in, committed versions and searchable catalog entries
//! out, all against a temporary data directory.

use ratebook::core::types::ServiceCategory;
use ratebook::ingest::{ingest_sheet, IngestError, IngestOptions};
use ratebook::parsing::ValidationError;
use ratebook::query::{CatalogQuery, SearchParams};
use ratebook::store::versions::VersionManager;
use ratebook::store::StoreError;

fn manager() -> (tempfile::TempDir, VersionManager) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mgr = VersionManager::open(dir.path()).expect("open stores");
    (dir, mgr)
}

fn water_options() -> IngestOptions {
    IngestOptions::new(ServiceCategory::WaterTesting)
}

const VALID_CSV: &str = "\
Group,Test Name,Method,Unit,Rate,TAT (days),NABL
Metals,Lead,IS 3025-47,mg/L,350,3,Yes
Metals,Cadmium,IS 3025-41,mg/L,420.50,3,Yes
physico chemcial,pH,,pH,150,1,NA
";

#[test]
fn test_first_upload_commits_version_one() {
    let (_dir, mgr) = manager();

    let outcome = ingest_sheet(
        &mgr,
        VALID_CSV.as_bytes(),
        Some("water_testing_rates.csv"),
        &water_options(),
    )
    .expect("upload should commit");

    assert_eq!(outcome.category, "Water Testing");
    assert_eq!(outcome.version, 1);
    assert_eq!(outcome.summary.inserted, 3);
    assert_eq!(outcome.summary.updated, 0);

    let infos = mgr.list_versions("Water Testing").expect("history");
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].test_count, 3);
    assert!(infos[0].is_active);
}

#[test]
fn test_uploaded_entries_are_normalized_and_searchable() {
    let (_dir, mgr) = manager();
    ingest_sheet(&mgr, VALID_CSV.as_bytes(), Some("rates.csv"), &water_options())
        .expect("upload should commit");

    let q = CatalogQuery::new(&mgr);

    // The misspelled "physico chemcial" group comes back corrected and
    // title-cased.
    let groups = q.groups(ServiceCategory::WaterTesting).expect("groups");
    assert_eq!(groups, vec!["Metals", "Physico Chemical"]);

    let mut params = SearchParams::new(ServiceCategory::WaterTesting);
    params.query = Some("lead".into());
    let page = q.search(&params).expect("search");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].test_name, "Lead");
    assert_eq!(page.items[0].unit.as_deref(), Some("mg/L"));
    assert_eq!(page.items[0].method.as_deref(), Some("IS 3025-47"));
}

#[test]
fn test_missing_rate_column_rejects_before_any_write() {
    let (_dir, mgr) = manager();
    let csv = "Group,Test Name,Unit\nMetals,Lead,mg/L\n";

    let err = ingest_sheet(&mgr, csv.as_bytes(), Some("rates.csv"), &water_options())
        .expect_err("upload must be rejected");

    match err {
        IngestError::Validation(ValidationError::MissingColumn { column, seen }) => {
            assert_eq!(column.to_string(), "Rate");
            assert_eq!(seen, vec!["Group", "Test Name", "Unit"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Nothing was committed.
    let err = mgr.list_versions("Water Testing").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn test_any_row_error_rejects_the_whole_batch() {
    let (_dir, mgr) = manager();
    let csv = "\
Group,Test Name,Rate
Metals,Lead,350
Metals,Cadmium,-10
,Zinc,200
Metals,Mercury,call us
";

    let err = ingest_sheet(&mgr, csv.as_bytes(), Some("rates.csv"), &water_options())
        .expect_err("upload must be rejected");

    let IngestError::Validation(ValidationError::RowErrors { errors }) = err else {
        panic!("expected accumulated row errors");
    };
    assert_eq!(errors.len(), 3);
    // 1-based data-row numbering.
    assert_eq!(errors[0].row, 2);
    assert!(errors[0].message.contains("negative"));
    assert_eq!(errors[1].row, 3);
    assert_eq!(errors[2].row, 4);

    // The valid rows were not committed either.
    assert!(matches!(
        mgr.list_versions("Water Testing").unwrap_err(),
        StoreError::NotFound { .. }
    ));
}

#[test]
fn test_reupload_with_identifiers_updates_instead_of_inserting() {
    let (_dir, mgr) = manager();
    ingest_sheet(&mgr, VALID_CSV.as_bytes(), Some("rates.csv"), &water_options())
        .expect("first upload");

    // Rebuild the sheet with the committed fingerprints in an Id column,
    // as an exported sheet would carry them.
    let entries = mgr
        .catalog()
        .load_entries(ServiceCategory::WaterTesting)
        .expect("entries");
    assert_eq!(entries.len(), 3);

    let mut csv = String::from("Id,Group,Test Name,Unit,Rate\n");
    for e in &entries {
        csv.push_str(&format!(
            "{},{},{},{},999\n",
            e.fingerprint,
            e.group.as_deref().unwrap_or(""),
            e.test_name,
            e.unit.as_deref().unwrap_or("")
        ));
    }

    let outcome = ingest_sheet(&mgr, csv.as_bytes(), Some("rates.csv"), &water_options())
        .expect("second upload");
    assert_eq!(outcome.version, 2);
    assert_eq!(outcome.summary.updated, 3);
    assert_eq!(outcome.summary.inserted, 0);

    // No duplicates in the catalog.
    let entries = mgr
        .catalog()
        .load_entries(ServiceCategory::WaterTesting)
        .expect("entries");
    assert_eq!(entries.len(), 3);
}

#[test]
fn test_rollback_survives_an_identity_changing_update() {
    let (_dir, mgr) = manager();
    ingest_sheet(&mgr, VALID_CSV.as_bytes(), Some("rates.csv"), &water_options())
        .expect("first upload");

    // Re-upload with the exported identifiers but the Metals rows re-grouped
    // under "Heavy Metals". Their fingerprints change, so version 2 references
    // new entries while version 1 keeps pointing at the old ones.
    let entries = mgr
        .catalog()
        .load_entries(ServiceCategory::WaterTesting)
        .expect("entries");
    let mut csv = String::from("Id,Group,Test Name,Unit,Rate\n");
    for e in &entries {
        let group = match e.group.as_deref() {
            Some("Metals") => "Heavy Metals",
            other => other.unwrap_or(""),
        };
        csv.push_str(&format!(
            "{},{},{},{},999\n",
            e.fingerprint,
            group,
            e.test_name,
            e.unit.as_deref().unwrap_or("")
        ));
    }
    let outcome = ingest_sheet(&mgr, csv.as_bytes(), Some("rates.csv"), &water_options())
        .expect("second upload");
    assert_eq!(outcome.version, 2);
    assert_eq!(outcome.summary.updated, 3);

    let q = CatalogQuery::new(&mgr);
    let mut params = SearchParams::new(ServiceCategory::WaterTesting);
    params.query = Some("Lead".into());
    let page = q.search(&params).expect("search");
    assert_eq!(page.items[0].group.as_deref(), Some("Heavy Metals"));

    // Rolling back must bring the original identities back into search.
    mgr.activate_version("Water Testing", 1, Some("admin".into()), None)
        .expect("rollback");
    let page = q.search(&params).expect("search");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].group.as_deref(), Some("Metals"));
}

#[test]
fn test_failed_version_commit_leaves_the_catalog_untouched() {
    let (dir, mgr) = manager();
    ingest_sheet(&mgr, VALID_CSV.as_bytes(), Some("rates.csv"), &water_options())
        .expect("first upload");

    // Corrupt the rate list document so the next commit fails while loading
    // the version history.
    let doc_path = dir.path().join("rate_lists").join("water-testing.json");
    std::fs::write(&doc_path, "{ not json").expect("corrupt document");

    let csv = "Group,Test Name,Unit,Rate\nMetals,Zinc,mg/L,180\n";
    let err = ingest_sheet(&mgr, csv.as_bytes(), Some("rates.csv"), &water_options())
        .expect_err("commit must fail on the corrupt document");
    assert!(matches!(err, IngestError::Store(StoreError::Serde(_))));

    // The rejected upload must not have written any catalog entries.
    let entries = mgr
        .catalog()
        .load_entries(ServiceCategory::WaterTesting)
        .expect("entries");
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.test_name != "Zinc"));
}

#[test]
fn test_rollback_restores_the_previous_search_surface() {
    let (_dir, mgr) = manager();
    ingest_sheet(&mgr, VALID_CSV.as_bytes(), Some("rates.csv"), &water_options())
        .expect("first upload");

    // Version 2 drops the pH row.
    let csv = "Group,Test Name,Unit,Rate\nMetals,Lead,mg/L,350\nMetals,Cadmium,mg/L,420\n";
    ingest_sheet(&mgr, csv.as_bytes(), Some("rates.csv"), &water_options())
        .expect("second upload");

    let q = CatalogQuery::new(&mgr);
    let mut params = SearchParams::new(ServiceCategory::WaterTesting);
    params.query = Some("pH".into());
    assert_eq!(q.search(&params).expect("search").total, 0);

    mgr.activate_version("Water Testing", 1, Some("admin".into()), None)
        .expect("rollback");
    assert_eq!(q.search(&params).expect("search").total, 1);

    // History survives the rollback; version 2 is still there.
    let infos = mgr.list_versions("Water Testing").expect("history");
    assert_eq!(infos.len(), 2);
    assert!(infos.iter().any(|v| v.version_number == 2 && !v.is_active));
}

#[test]
fn test_tab_separated_upload_without_extension_is_sniffed() {
    let (_dir, mgr) = manager();
    let tsv = "Group\tTest Name\tRate\nMetals\tLead\t350\n";

    let outcome = ingest_sheet(&mgr, tsv.as_bytes(), None, &water_options())
        .expect("sniffed tsv should decode");
    assert_eq!(outcome.summary.inserted, 1);
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let (_dir, mgr) = manager();
    let err = ingest_sheet(&mgr, b"%PDF-1.4", Some("rates.pdf"), &water_options())
        .expect_err("pdf must be rejected");
    assert!(matches!(err, IngestError::Parse(_)));
}
