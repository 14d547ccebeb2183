//! Command-line interface for ratebook.
//!
//! Available commands:
//!
//! - **ingest**: Upload a rate sheet from disk and commit a new version
//! - **versions**: Show the version history of a category
//! - **activate**: Roll a category to any existing version
//! - **delete**: Hard-delete a category's rate list (history included)
//! - **serve**: Start the HTTP API
//!
//! ## Usage
//!
//! ```text
//! # Ingest a price list for Water Testing
//! ratebook ingest water_testing_rates.xlsx
//!
//! # JSON output for scripting
//! ratebook ingest rates.csv --service "Water Testing" --format json
//!
//! # Inspect and roll back history
//! ratebook versions "Water Testing"
//! ratebook activate "Water Testing" 3 --notes "reverting price mistake"
//!
//! # Start the API
//! ratebook serve --port 8080
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod ingest;
pub mod versions;

#[derive(Parser)]
#[command(name = "ratebook")]
#[command(version)]
#[command(about = "Ingest, version and query laboratory test rate catalogs")]
#[command(
    long_about = "ratebook ingests spreadsheet rate lists, normalizes messy hand-entered fields, reconciles rows against the existing catalog, and keeps an auditable, rollback-capable version history per category.\n\nEvery upload either fully commits as a new active version or is rejected with the complete list of problems found in the file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Data directory holding rate lists and the catalog
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a rate sheet and commit a new version
    Ingest(ingest::IngestArgs),

    /// List the version history of a category
    Versions(versions::VersionsArgs),

    /// Activate (roll back to) an existing version
    Activate(versions::ActivateArgs),

    /// Hard-delete a category's rate list and its whole history
    Delete(versions::DeleteArgs),

    /// Start the web server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
