//! File-backed store for per-category rate list documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::document::RateListDocument;
use crate::store::flock::FileLock;
use crate::store::{slug, StoreError};

/// One JSON document per category under `<data_dir>/rate_lists/`.
///
/// All writes go through [`RateListStore::compare_and_save`], which holds the
/// category's in-process lock plus an advisory file lock across a re-read of
/// the on-disk document and the atomic rename, rejecting the write if the
/// version sequence moved underneath the caller. The file lock covers
/// writers in other processes sharing the same data directory. A blind
/// read-then-write path deliberately does not exist.
#[derive(Debug)]
pub struct RateListStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RateListStore {
    /// Open (creating if needed) the rate list directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let dir = data_dir.join("rate_lists");
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slug(category)))
    }

    fn lock_path_for(&self, category: &str) -> PathBuf {
        self.dir.join(format!(".{}.lock", slug(category)))
    }

    fn lock_for(&self, category: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(slug(category)).or_default().clone()
    }

    fn read_document(path: &Path) -> Result<Option<RateListDocument>, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the document for a category, `None` if it has never been created.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Serde`] on unreadable or corrupt
    /// documents.
    pub fn load(&self, category: &str) -> Result<Option<RateListDocument>, StoreError> {
        Self::read_document(&self.path_for(category))
    }

    /// Load every stored document (used by the query service to find the
    /// documents of a service).
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Serde`] on unreadable documents.
    pub fn load_all(&self) -> Result<Vec<RateListDocument>, StoreError> {
        let mut documents = Vec::new();
        for dirent in std::fs::read_dir(&self.dir)? {
            let path = dirent?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(doc) = Self::read_document(&path)? {
                    documents.push(doc);
                }
            }
        }
        documents.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(documents)
    }

    /// Persist a document if and only if the on-disk version sequence still
    /// matches `expected_max` (0 for a document that should not yet exist).
    ///
    /// The category lock is held across the re-read and the rename, and the
    /// rename itself is atomic, so concurrent readers see either the old or
    /// the new document, never a partial write.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] when the compare-and-swap predicate
    /// fails; the caller may reload and retry.
    pub fn compare_and_save(
        &self,
        document: &RateListDocument,
        expected_max: u32,
    ) -> Result<(), StoreError> {
        debug_assert!(
            document.mirror_is_consistent(),
            "tests mirror out of sync with active snapshot"
        );

        let lock = self.lock_for(&document.category);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _flock = FileLock::acquire(&self.lock_path_for(&document.category))?;

        let path = self.path_for(&document.category);
        let on_disk_max = Self::read_document(&path)?
            .map(|d| d.max_version())
            .unwrap_or(0);
        if on_disk_max != expected_max {
            return Err(StoreError::VersionConflict {
                category: document.category.clone(),
            });
        }

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&tmp, document)?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Administrative hard delete of a category's document, history and all.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the category has no document.
    pub fn delete(&self, category: &str) -> Result<(), StoreError> {
        let lock = self.lock_for(category);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _flock = FileLock::acquire(&self.lock_path_for(category))?;

        let path = self.path_for(category);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(format!("rate list '{category}'")))
            }
            Err(e) => Err(e.into()),
        }
    }
}
