use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::store::versions::VersionManager;

#[derive(Args)]
pub struct VersionsArgs {
    /// Rate list category (e.g., "Water Testing")
    #[arg(required = true)]
    pub category: String,
}

#[derive(Args)]
pub struct ActivateArgs {
    /// Rate list category (e.g., "Water Testing")
    #[arg(required = true)]
    pub category: String,

    /// Version number to activate
    #[arg(required = true)]
    pub version: u32,

    /// Free-form notes recorded in the audit log
    #[arg(long)]
    pub notes: Option<String>,

    /// Actor name recorded in the audit log
    #[arg(long = "by")]
    pub actor: Option<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Rate list category (e.g., "Water Testing")
    #[arg(required = true)]
    pub category: String,
}

/// Execute the versions subcommand
///
/// # Errors
///
/// Returns an error if the category does not exist or the store fails.
pub fn run(args: &VersionsArgs, data_dir: &PathBuf, format: OutputFormat) -> anyhow::Result<()> {
    let manager = VersionManager::open(data_dir)?;
    let infos = manager.list_versions(&args.category)?;

    match format {
        OutputFormat::Text => {
            println!("Version history of '{}'\n", args.category);
            println!("{:>8} {:>7} {:>8}  {:<20} {}", "Version", "Active", "Tests", "Created", "Notes");
            println!("{}", "-".repeat(70));
            for info in &infos {
                println!(
                    "{:>8} {:>7} {:>8}  {:<20} {}",
                    info.version_number,
                    if info.is_active { "yes" } else { "" },
                    info.test_count,
                    info.created_at.format("%Y-%m-%d %H:%M:%S"),
                    info.notes.as_deref().unwrap_or("")
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
    }

    Ok(())
}

/// Execute the activate subcommand
///
/// # Errors
///
/// Returns an error if the category or version does not exist or if the
/// write loses a concurrent race too many times.
pub fn run_activate(
    args: &ActivateArgs,
    data_dir: &PathBuf,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let manager = VersionManager::open(data_dir)?;
    manager.activate_version(
        &args.category,
        args.version,
        args.actor.clone(),
        args.notes.clone(),
    )?;

    match format {
        OutputFormat::Text => {
            println!("'{}' is now at version {}", args.category, args.version);
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "category": args.category,
                    "active_version": args.version,
                })
            );
        }
    }

    Ok(())
}

/// Execute the delete subcommand
///
/// # Errors
///
/// Returns an error if the category does not exist or the file cannot be
/// removed.
pub fn run_delete(
    args: &DeleteArgs,
    data_dir: &PathBuf,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let manager = VersionManager::open(data_dir)?;
    manager.delete_rate_list(&args.category)?;

    match format {
        OutputFormat::Text => {
            println!("Deleted rate list '{}' and its history", args.category);
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({ "category": args.category, "deleted": true })
            );
        }
    }

    Ok(())
}
