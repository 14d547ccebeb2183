//! Core data types for rate lists, catalog entries and version history.
//!
//! - [`types`]: cell values, accreditation flags, the fixed service enum
//! - [`rate`]: the priced test carried by version snapshots
//! - [`entry`]: the flattened, query-facing catalog entry and its fingerprint
//! - [`document`]: per-category version history and active-version mirror

pub mod document;
pub mod entry;
pub mod rate;
pub mod types;

pub use document::{AuditEvent, RateListDocument, VersionInfo, VersionSnapshot};
pub use entry::CatalogEntry;
pub use rate::RateTest;
pub use types::{AccreditationStatus, CellValue, ServiceCategory};
