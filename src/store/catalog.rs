//! File-backed store for the per-service catalog entry collection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::core::entry::CatalogEntry;
use crate::core::types::ServiceCategory;
use crate::store::flock::FileLock;
use crate::store::{slug, StoreError};

/// Serialized shape of a service's entry collection.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogData {
    entries: Vec<CatalogEntry>,
}

/// One JSON collection per service under `<data_dir>/catalog/`, keyed by
/// entry fingerprint.
///
/// Entries accumulate across uploads: updates replace in place, inserts
/// append, and nothing is removed on upload, because older version snapshots
/// still reference their fingerprints.
#[derive(Debug)]
pub struct CatalogStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CatalogStore {
    /// Open (creating if needed) the catalog directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let dir = data_dir.join("catalog");
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn path_for(&self, service: ServiceCategory) -> PathBuf {
        self.dir.join(format!("{}.json", slug(service.display_name())))
    }

    fn lock_path_for(&self, service: ServiceCategory) -> PathBuf {
        self.dir.join(format!(".{}.lock", slug(service.display_name())))
    }

    fn lock_for(&self, service: ServiceCategory) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(slug(service.display_name())).or_default().clone()
    }

    fn read_data(path: &Path) -> Result<CatalogData, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CatalogData::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// All entries for a service, in stored order. Empty for a service that
    /// has never been uploaded to.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Serde`] on unreadable collections.
    pub fn load_entries(&self, service: ServiceCategory) -> Result<Vec<CatalogEntry>, StoreError> {
        Ok(Self::read_data(&self.path_for(service))?.entries)
    }

    /// Apply one upload's entries: replace matches by fingerprint, append the
    /// rest, preserving stored order for survivors. Entries are never removed
    /// here, not even when an update changed a row's identity fields: older
    /// version snapshots still reference the superseded fingerprint, and
    /// activating one of them must bring those entries back into the search
    /// surface.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Serde`] on persistence failures.
    pub fn upsert_entries(
        &self,
        service: ServiceCategory,
        upserts: &[CatalogEntry],
    ) -> Result<(), StoreError> {
        let lock = self.lock_for(service);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _flock = FileLock::acquire(&self.lock_path_for(service))?;

        let path = self.path_for(service);
        let mut data = Self::read_data(&path)?;

        let mut index: HashMap<String, usize> = data
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.fingerprint.clone(), i))
            .collect();

        for entry in upserts {
            match index.get(&entry.fingerprint) {
                Some(&i) => data.entries[i] = entry.clone(),
                None => {
                    index.insert(entry.fingerprint.clone(), data.entries.len());
                    data.entries.push(entry.clone());
                }
            }
        }

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&tmp, &data)?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, rate_unit: Option<&str>) -> CatalogEntry {
        let fingerprint = CatalogEntry::fingerprint_of("water-testing", Some("Metals"), name, rate_unit);
        CatalogEntry {
            service_id: "water-testing".into(),
            service_name: "Water Testing".into(),
            group: Some("Metals".into()),
            test_name: name.into(),
            printable_text: None,
            method: None,
            unit: rate_unit.map(str::to_string),
            tat_days: Some(3),
            accreditation_status: None,
            department: None,
            fingerprint,
        }
    }

    #[test]
    fn test_upsert_inserts_then_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path()).unwrap();
        let svc = ServiceCategory::WaterTesting;

        store
            .upsert_entries(svc, &[entry("Lead", Some("mg/L"))])
            .unwrap();
        assert_eq!(store.load_entries(svc).unwrap().len(), 1);

        // Same fingerprint: replaced, not duplicated.
        let mut updated = entry("Lead", Some("mg/L"));
        updated.method = Some("IS 3025".into());
        store.upsert_entries(svc, &[updated]).unwrap();

        let entries = store.load_entries(svc).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method.as_deref(), Some("IS 3025"));
    }

    #[test]
    fn test_identity_change_keeps_the_superseded_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path()).unwrap();
        let svc = ServiceCategory::WaterTesting;

        let old = entry("Lead", Some("mg/L"));
        let old_id = old.fingerprint.clone();
        store.upsert_entries(svc, &[old]).unwrap();

        // Identity changed (new unit): a fresh fingerprint appends, but the
        // superseded one stays resolvable for older snapshots.
        let renamed = entry("Lead", Some("µg/L"));
        store.upsert_entries(svc, &[renamed.clone()]).unwrap();

        let entries = store.load_entries(svc).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.fingerprint == old_id));
        assert!(entries.iter().any(|e| e.fingerprint == renamed.fingerprint));
    }

    #[test]
    fn test_services_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path()).unwrap();
        store
            .upsert_entries(ServiceCategory::WaterTesting, &[entry("Lead", None)])
            .unwrap();
        assert!(store.load_entries(ServiceCategory::AirTesting).unwrap().is_empty());
    }
}
