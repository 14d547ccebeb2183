use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::rate::RateTest;

/// One immutable version of a category's rate list.
///
/// Snapshots are append-only: nothing ever mutates or deletes one after it
/// has been written. Rollback only moves the document's `current_version`
/// pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    /// Monotonic per category, starting at 1.
    pub version_number: u32,

    pub tests: Vec<RateTest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Fingerprints of the catalog entries belonging to this version.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalog_ids: Vec<String>,
}

/// Version metadata for history views. Never carries the test payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version_number: u32,
    pub test_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// One audit trail event on a rate list document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub action: String,
}

/// The per-category rate list document: full append-only version history plus
/// a denormalized mirror of the active version's tests.
///
/// `tests` is a cache for readers; `versions` is the only audit source of
/// truth. Every write path re-establishes the invariant that `tests` equals
/// the active snapshot's tests before the document is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateListDocument {
    /// Unique key, e.g. "Water Testing".
    pub category: String,

    pub service_id: String,

    /// Mirror of `versions[current_version].tests`.
    pub tests: Vec<RateTest>,

    pub versions: Vec<VersionSnapshot>,

    pub current_version: u32,

    pub is_active: bool,

    pub last_updated: DateTime<Utc>,

    /// Activation and upload audit notes, append-only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit_log: Vec<AuditEvent>,
}

impl RateListDocument {
    /// Create a new document with its first version, immediately active.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        service_id: impl Into<String>,
        tests: Vec<RateTest>,
        catalog_ids: Vec<String>,
        notes: Option<String>,
        created_by: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let snapshot = VersionSnapshot {
            version_number: 1,
            tests: tests.clone(),
            notes,
            created_by,
            created_at: now,
            catalog_ids,
        };
        Self {
            category: category.into(),
            service_id: service_id.into(),
            tests,
            versions: vec![snapshot],
            current_version: 1,
            is_active: true,
            last_updated: now,
            audit_log: Vec::new(),
        }
    }

    /// Append an audit note (activation, rollback, upload).
    pub fn record_audit(&mut self, actor: Option<String>, action: impl Into<String>) {
        self.audit_log.push(AuditEvent {
            at: Utc::now(),
            actor,
            action: action.into(),
        });
    }

    /// Highest version number present, 0 for an empty (never-written) history.
    #[must_use]
    pub fn max_version(&self) -> u32 {
        self.versions.iter().map(|v| v.version_number).max().unwrap_or(0)
    }

    #[must_use]
    pub fn snapshot(&self, version_number: u32) -> Option<&VersionSnapshot> {
        self.versions.iter().find(|v| v.version_number == version_number)
    }

    /// The snapshot `current_version` points at.
    #[must_use]
    pub fn active_snapshot(&self) -> Option<&VersionSnapshot> {
        self.snapshot(self.current_version)
    }

    /// Append the next snapshot and make it active, mirroring its tests.
    ///
    /// Returns the new version number. The caller (the version manager) is
    /// responsible for the compare-and-swap that makes this safe under
    /// concurrent writers.
    pub fn append_version(
        &mut self,
        tests: Vec<RateTest>,
        catalog_ids: Vec<String>,
        notes: Option<String>,
        created_by: Option<String>,
    ) -> u32 {
        let next = self.max_version() + 1;
        let now = Utc::now();
        self.versions.push(VersionSnapshot {
            version_number: next,
            tests: tests.clone(),
            notes,
            created_by,
            created_at: now,
            catalog_ids,
        });
        self.current_version = next;
        self.tests = tests;
        self.last_updated = now;
        next
    }

    /// Switch the active pointer to an existing version (the rollback path).
    ///
    /// Pure with respect to history: no snapshot is touched, only the pointer
    /// and the mirror change. Returns false if the version number is unknown,
    /// leaving the document untouched.
    #[must_use]
    pub fn activate(&mut self, version_number: u32) -> bool {
        let Some(snapshot) = self.snapshot(version_number) else {
            return false;
        };
        self.tests = snapshot.tests.clone();
        self.current_version = version_number;
        self.last_updated = Utc::now();
        true
    }

    /// Version metadata, newest first.
    #[must_use]
    pub fn version_infos(&self) -> Vec<VersionInfo> {
        let mut infos: Vec<VersionInfo> = self
            .versions
            .iter()
            .map(|v| VersionInfo {
                version_number: v.version_number,
                test_count: v.tests.len(),
                notes: v.notes.clone(),
                created_by: v.created_by.clone(),
                created_at: v.created_at,
                is_active: v.version_number == self.current_version,
            })
            .collect();
        infos.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        infos
    }

    /// Check the mirror invariant; used by tests and the store's write path.
    #[must_use]
    pub fn mirror_is_consistent(&self) -> bool {
        self.active_snapshot().map(|s| s.tests == self.tests).unwrap_or(false)
    }
}
