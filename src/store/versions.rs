//! The version manager: append snapshots, flip the active pointer, roll
//! back, and keep history views lightweight.

use std::path::Path;

use tracing::info;

use crate::core::document::{RateListDocument, VersionInfo};
use crate::core::rate::RateTest;
use crate::store::catalog::CatalogStore;
use crate::store::rate_lists::RateListStore;
use crate::store::StoreError;

/// How many times a writer re-runs its read-modify-write cycle after losing
/// a compare-and-swap race before giving up.
const CAS_RETRIES: usize = 8;

/// Facade over the two stores implementing version lifecycle operations.
///
/// Every mutation is a pure transformation of a loaded document applied
/// through [`RateListStore::compare_and_save`], so concurrent writers for
/// the same category can never both claim a version number or silently drop
/// an upload: the loser's CAS fails and its cycle is retried from a fresh
/// read.
#[derive(Debug)]
pub struct VersionManager {
    rate_lists: RateListStore,
    catalog: CatalogStore,
}

impl VersionManager {
    /// Open both stores under the given data directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directories cannot be created.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            rate_lists: RateListStore::open(data_dir)?,
            catalog: CatalogStore::open(data_dir)?,
        })
    }

    #[must_use]
    pub fn rate_lists(&self) -> &RateListStore {
        &self.rate_lists
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Append a new version for a category and make it active.
    ///
    /// Creates the document (version 1) if the category is new. Returns the
    /// committed version number.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] if the category kept changing under
    /// concurrent writers beyond the retry budget.
    #[allow(clippy::too_many_arguments)]
    pub fn create_version(
        &self,
        category: &str,
        service_id: &str,
        tests: Vec<RateTest>,
        catalog_ids: Vec<String>,
        notes: Option<String>,
        created_by: Option<String>,
    ) -> Result<u32, StoreError> {
        let mut last_err = None;
        for _ in 0..CAS_RETRIES {
            let (mut document, expected_max, version) = match self.rate_lists.load(category)? {
                Some(mut doc) => {
                    let expected = doc.max_version();
                    let version = doc.append_version(
                        tests.clone(),
                        catalog_ids.clone(),
                        notes.clone(),
                        created_by.clone(),
                    );
                    (doc, expected, version)
                }
                None => (
                    RateListDocument::new(
                        category,
                        service_id,
                        tests.clone(),
                        catalog_ids.clone(),
                        notes.clone(),
                        created_by.clone(),
                    ),
                    0,
                    1,
                ),
            };
            document.record_audit(
                created_by.clone(),
                format!("uploaded version {version} ({} tests)", tests.len()),
            );

            match self.rate_lists.compare_and_save(&document, expected_max) {
                Ok(()) => {
                    info!(category, version, "committed rate list version");
                    return Ok(version);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    last_err = Some(StoreError::VersionConflict {
                        category: category.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(StoreError::VersionConflict {
            category: category.to_string(),
        }))
    }

    /// Switch the active version pointer (the rollback path).
    ///
    /// No snapshot data is deleted or rewritten; only the pointer and the
    /// mirrored test list change, plus an audit note.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown category or version number.
    pub fn activate_version(
        &self,
        category: &str,
        version_number: u32,
        activated_by: Option<String>,
        notes: Option<String>,
    ) -> Result<(), StoreError> {
        let mut last_err = None;
        for _ in 0..CAS_RETRIES {
            let mut document = self
                .rate_lists
                .load(category)?
                .ok_or_else(|| StoreError::not_found(format!("rate list '{category}'")))?;
            let expected_max = document.max_version();

            if !document.activate(version_number) {
                return Err(StoreError::not_found(format!(
                    "version {version_number} of rate list '{category}'"
                )));
            }
            let note = match &notes {
                Some(n) => format!("activated version {version_number}: {n}"),
                None => format!("activated version {version_number}"),
            };
            document.record_audit(activated_by.clone(), note);

            match self.rate_lists.compare_and_save(&document, expected_max) {
                Ok(()) => {
                    info!(category, version_number, "activated rate list version");
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) => {
                    last_err = Some(StoreError::VersionConflict {
                        category: category.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(StoreError::VersionConflict {
            category: category.to_string(),
        }))
    }

    /// Version metadata for a category, newest first. Never the payload.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown category.
    pub fn list_versions(&self, category: &str) -> Result<Vec<VersionInfo>, StoreError> {
        let document = self
            .rate_lists
            .load(category)?
            .ok_or_else(|| StoreError::not_found(format!("rate list '{category}'")))?;
        Ok(document.version_infos())
    }

    /// Administrative hard delete of a category's document and history.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown category.
    pub fn delete_rate_list(&self, category: &str) -> Result<(), StoreError> {
        self.rate_lists.delete(category)?;
        info!(category, "deleted rate list");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tests_of(n: usize) -> Vec<RateTest> {
        (0..n).map(|i| RateTest::new(format!("T{i}"), 50.0, 2)).collect()
    }

    fn manager() -> (tempfile::TempDir, VersionManager) {
        let dir = tempfile::tempdir().unwrap();
        let mgr = VersionManager::open(dir.path()).unwrap();
        (dir, mgr)
    }

    #[test]
    fn test_first_upload_creates_version_one() {
        let (_dir, mgr) = manager();
        let v = mgr
            .create_version("Water Testing", "water-testing", tests_of(10), vec![], None, None)
            .unwrap();
        assert_eq!(v, 1);

        let infos = mgr.list_versions("Water Testing").unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].test_count, 10);
        assert!(infos[0].is_active);
    }

    #[test]
    fn test_rollback_scenario() {
        let (_dir, mgr) = manager();
        mgr.create_version("Water Testing", "water-testing", tests_of(10), vec![], None, None)
            .unwrap();
        mgr.create_version("Water Testing", "water-testing", tests_of(12), vec![], None, None)
            .unwrap();

        mgr.activate_version("Water Testing", 1, Some("admin".into()), Some("rollback".into()))
            .unwrap();

        let doc = mgr.rate_lists().load("Water Testing").unwrap().unwrap();
        assert_eq!(doc.current_version, 1);
        assert_eq!(doc.tests.len(), 10);
        assert!(doc.mirror_is_consistent());
        assert!(doc.audit_log.iter().any(|e| e.action.contains("activated version 1")));

        let infos = mgr.list_versions("Water Testing").unwrap();
        assert_eq!(infos[0].version_number, 2);
        assert!(!infos[0].is_active);
        assert!(infos[1].is_active);
        // v2 remains fully retrievable.
        assert_eq!(doc.snapshot(2).unwrap().tests.len(), 12);
    }

    #[test]
    fn test_activate_unknown_version_is_not_found() {
        let (_dir, mgr) = manager();
        mgr.create_version("Water Testing", "water-testing", tests_of(1), vec![], None, None)
            .unwrap();
        let err = mgr.activate_version("Water Testing", 9, None, None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = mgr.activate_version("Moon Testing", 1, None, None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_concurrent_writers_never_share_a_version_number() {
        let (_dir, mgr) = manager();
        let mgr = Arc::new(mgr);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mgr = Arc::clone(&mgr);
                std::thread::spawn(move || {
                    mgr.create_version(
                        "Water Testing",
                        "water-testing",
                        tests_of(i + 1),
                        vec![],
                        None,
                        None,
                    )
                    .unwrap()
                })
            })
            .collect();

        let mut versions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, vec![1, 2, 3, 4]);

        let doc = mgr.rate_lists().load("Water Testing").unwrap().unwrap();
        assert_eq!(doc.versions.len(), 4);
        assert_eq!(doc.max_version(), 4);
    }

    #[test]
    fn test_writers_on_separate_handles_never_share_a_version_number() {
        // Two managers on the same data directory model a CLI ingest racing
        // a running server: they share no in-process locks, so only the
        // advisory file lock and the compare-and-swap serialize them.
        let dir = tempfile::tempdir().unwrap();
        let a = Arc::new(VersionManager::open(dir.path()).unwrap());
        let b = Arc::new(VersionManager::open(dir.path()).unwrap());

        let handles: Vec<_> = [&a, &b, &a, &b]
            .into_iter()
            .cloned()
            .enumerate()
            .map(|(i, mgr)| {
                std::thread::spawn(move || {
                    mgr.create_version(
                        "Water Testing",
                        "water-testing",
                        tests_of(i + 1),
                        vec![],
                        None,
                        None,
                    )
                    .unwrap()
                })
            })
            .collect();

        let mut versions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, vec![1, 2, 3, 4]);

        let doc = a.rate_lists().load("Water Testing").unwrap().unwrap();
        assert_eq!(doc.versions.len(), 4);
    }
}
