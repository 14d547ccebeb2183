use serde::{Deserialize, Serialize};

use crate::core::types::AccreditationStatus;

/// Flattened, query-facing catalog entry.
///
/// One entry per rate-list row. The `fingerprint` is a deterministic hash of
/// the normalized identity fields and is how "the same" entry is recognized
/// across uploads: an exported sheet carries fingerprints in its id column,
/// and rows that bring one back are reconciled as updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub service_id: String,
    pub service_name: String,

    /// Normalized group ("Physico-Chemical Parameters", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    pub test_name: String,

    /// Display text shown on reports and quotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printable_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Normalized unit spelling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tat_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accreditation_status: Option<AccreditationStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    /// Lowercase hex MD5 over the normalized identity fields.
    pub fingerprint: String,
}

impl CatalogEntry {
    /// Compute the identity fingerprint for an entry.
    ///
    /// Identity is (service id, group, test name, unit), each lowercased and
    /// trimmed, joined with `|` and hashed with MD5. Price and display fields
    /// are deliberately excluded so a price change does not mint a new
    /// identity.
    #[must_use]
    pub fn fingerprint_of(
        service_id: &str,
        group: Option<&str>,
        test_name: &str,
        unit: Option<&str>,
    ) -> String {
        let norm = |s: &str| s.trim().to_lowercase();
        let identity = format!(
            "{}|{}|{}|{}",
            norm(service_id),
            group.map(norm).unwrap_or_default(),
            norm(test_name),
            unit.map(norm).unwrap_or_default(),
        );
        let digest = md5::compute(identity.as_bytes());
        format!("{digest:x}")
    }
}
