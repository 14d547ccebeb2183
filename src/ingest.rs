//! The synchronous upload pipeline: decode, validate, reconcile, commit.
//!
//! An upload either fully commits as a new version or is rejected with the
//! complete error list. Validation happens before any write; a batch with
//! row errors never reaches the stores.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::ServiceCategory;
use crate::parsing::{decode_sheet, parse_rows, resolve_columns, ParseError, ValidationError};
use crate::reconcile::{reconcile, ReconcileSummary};
use crate::store::versions::VersionManager;
use crate::store::{slug, StoreError};

/// Everything that can stop an upload.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Caller-supplied upload context.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub service: ServiceCategory,
    /// Rate list key; defaults to the service display name.
    pub category: Option<String>,
    /// Stable service identifier; defaults to the slugged service name.
    pub service_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

impl IngestOptions {
    #[must_use]
    pub fn new(service: ServiceCategory) -> Self {
        Self {
            service,
            category: None,
            service_id: None,
            notes: None,
            created_by: None,
        }
    }
}

/// Result of a committed upload.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub category: String,
    pub version: u32,
    #[serde(flatten)]
    pub summary: ReconcileSummary,
}

/// Run the full ingestion pipeline over uploaded bytes.
///
/// # Errors
///
/// [`IngestError::Parse`] for undecodable bytes, [`IngestError::Validation`]
/// when a required column is missing or any row fails validation (the whole
/// batch is rejected; no version is created), [`IngestError::Store`] for
/// persistence failures.
pub fn ingest_sheet(
    manager: &VersionManager,
    bytes: &[u8],
    filename: Option<&str>,
    options: &IngestOptions,
) -> Result<IngestOutcome, IngestError> {
    let sheet = decode_sheet(bytes, filename)?;
    let columns = resolve_columns(&sheet.headers)?;
    let batch = parse_rows(&sheet, &columns);

    if !batch.errors.is_empty() {
        warn!(
            error_count = batch.errors.len(),
            "rejecting upload batch with row errors"
        );
        return Err(ValidationError::RowErrors {
            errors: batch.errors,
        }
        .into());
    }

    let service = options.service;
    let category = options
        .category
        .clone()
        .unwrap_or_else(|| service.display_name().to_string());
    let service_id = options
        .service_id
        .clone()
        .unwrap_or_else(|| slug(service.display_name()));

    let scope = manager.catalog().load_entries(service)?;
    let changeset = reconcile(&batch.rows, &scope, service, &service_id, 0);
    debug!(
        updated = changeset.summary.updated,
        inserted = changeset.summary.inserted,
        "reconciled upload against existing catalog"
    );

    // The version commit is the transaction point: if it fails, the catalog
    // collection must be left exactly as it was.
    let version = manager.create_version(
        &category,
        &service_id,
        changeset.tests,
        changeset.catalog_ids,
        options.notes.clone(),
        options.created_by.clone(),
    )?;
    manager.catalog().upsert_entries(service, &changeset.entries)?;

    Ok(IngestOutcome {
        category,
        version,
        summary: changeset.summary,
    })
}
