use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::types::ServiceCategory;
use crate::ingest::{ingest_sheet, IngestError, IngestOptions};
use crate::parsing::ValidationError;
use crate::store::versions::VersionManager;

#[derive(Args)]
pub struct IngestArgs {
    /// Rate sheet to ingest (.xlsx, .xls, .csv, .tsv or .txt)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Service category (detected from the filename by default)
    #[arg(short, long)]
    pub service: Option<String>,

    /// Rate list key (defaults to the service display name)
    #[arg(long)]
    pub category: Option<String>,

    /// Free-form notes recorded with the new version
    #[arg(long)]
    pub notes: Option<String>,

    /// Uploader name recorded in the audit log
    #[arg(long = "by")]
    pub created_by: Option<String>,
}

/// Execute the ingest subcommand
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, if the service
/// cannot be resolved, or if validation rejects the batch.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(
    args: IngestArgs,
    data_dir: &PathBuf,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.input)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", args.input.display()))?;

    let filename = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let service = resolve_service(args.service.as_deref(), filename.as_deref())?;

    if verbose {
        eprintln!(
            "Ingesting {} ({} bytes) as {}",
            args.input.display(),
            bytes.len(),
            service.display_name()
        );
    }

    let manager = VersionManager::open(data_dir)?;
    let mut options = IngestOptions::new(service);
    options.category = args.category;
    options.notes = args.notes;
    options.created_by = args.created_by;

    let outcome = match ingest_sheet(&manager, &bytes, filename.as_deref(), &options) {
        Ok(outcome) => outcome,
        Err(IngestError::Validation(ValidationError::RowErrors { errors })) => {
            eprintln!("Upload rejected: {} row error(s)", errors.len());
            for e in &errors {
                eprintln!("  row {}: {}", e.row, e.message);
            }
            anyhow::bail!("no version was created");
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Text => {
            println!(
                "Committed version {} of '{}'",
                outcome.version, outcome.category
            );
            println!(
                "  {} updated, {} inserted",
                outcome.summary.updated, outcome.summary.inserted
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

fn resolve_service(flag: Option<&str>, filename: Option<&str>) -> anyhow::Result<ServiceCategory> {
    if let Some(name) = flag {
        return ServiceCategory::parse(name).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown service '{name}'. Allowed services: {}",
                ServiceCategory::allowed_list()
            )
        });
    }
    filename
        .and_then(ServiceCategory::from_filename)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "could not detect the service from the filename; pass --service. Allowed services: {}",
                ServiceCategory::allowed_list()
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_service_prefers_flag() {
        let service =
            resolve_service(Some("food testing"), Some("water_rates.xlsx")).unwrap();
        assert_eq!(service, ServiceCategory::FoodTesting);
    }

    #[test]
    fn test_resolve_service_falls_back_to_filename() {
        let service = resolve_service(None, Some("water_testing_rates.xlsx")).unwrap();
        assert_eq!(service, ServiceCategory::WaterTesting);
    }

    #[test]
    fn test_resolve_service_unknown_lists_allowed() {
        let err = resolve_service(Some("plasma testing"), None).unwrap_err();
        assert!(err.to_string().contains("Water Testing"));
    }
}
