//! # ratebook
//!
//! A library for ingesting, versioning and querying laboratory test rate
//! catalogs.
//!
//! Commercial testing labs maintain their price lists in spreadsheets that
//! are edited by hand: column headers drift, group names get misspelled,
//! units are written five different ways, and prices arrive with currency
//! symbols attached. `ratebook` accepts those files as they are, normalizes
//! the mess, validates every row, and commits the result as a new immutable
//! version of the category's rate list.
//!
//! ## Features
//!
//! - **Forgiving decoding**: XLSX, XLS, CSV and TSV inputs, with content
//!   sniffing when the extension lies
//! - **Fuzzy header resolution**: logical columns are found by alias and
//!   substring matching, so "Test Name", "test_name" and "Name of Test" all
//!   resolve to the same column
//! - **Batch validation**: every row error in a file is reported at once,
//!   and a file with any error commits nothing
//! - **Identity-based reconciliation**: rows carrying the fingerprint of an
//!   existing catalog entry update it; rows without one insert
//! - **Versioned history**: each upload appends an immutable snapshot; any
//!   older version can be re-activated without losing newer ones
//!
//! ## Example
//!
//! ```rust,no_run
//! use ratebook::core::types::ServiceCategory;
//! use ratebook::ingest::{ingest_sheet, IngestOptions};
//! use ratebook::store::versions::VersionManager;
//!
//! let manager = VersionManager::open(std::path::Path::new("data")).unwrap();
//! let bytes = std::fs::read("water_testing_rates.xlsx").unwrap();
//!
//! let options = IngestOptions::new(ServiceCategory::WaterTesting);
//! let outcome = ingest_sheet(&manager, &bytes, Some("water_testing_rates.xlsx"), &options).unwrap();
//!
//! println!(
//!     "version {}: {} updated, {} inserted",
//!     outcome.version, outcome.summary.updated, outcome.summary.inserted
//! );
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Core data types for tests, catalog entries and rate list documents
//! - [`normalize`]: Field-level cleanup of hand-entered spreadsheet values
//! - [`parsing`]: Spreadsheet decoding, header resolution and row validation
//! - [`reconcile`]: Update/insert matching of parsed rows against the catalog
//! - [`store`]: Atomic JSON persistence and the version manager
//! - [`query`]: Read-only search over the active catalog
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: Web server exposing upload, history and search endpoints

pub mod cli;
pub mod core;
pub mod ingest;
pub mod normalize;
pub mod parsing;
pub mod query;
pub mod reconcile;
pub mod store;
pub mod web;

// Re-export commonly used types for convenience
pub use core::document::{RateListDocument, VersionInfo, VersionSnapshot};
pub use core::entry::CatalogEntry;
pub use core::rate::RateTest;
pub use core::types::{CellValue, ServiceCategory};
pub use ingest::{ingest_sheet, IngestOptions, IngestOutcome};
pub use query::{CatalogQuery, SearchParams};
pub use store::versions::VersionManager;
