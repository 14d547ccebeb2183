use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod core;
mod ingest;
mod normalize;
mod parsing;
mod query;
mod reconcile;
mod store;
mod web;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("ratebook=debug,info")
    } else {
        EnvFilter::new("ratebook=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Ingest(args) => {
            cli::ingest::run(args, &cli.data_dir, cli.format, cli.verbose)?;
        }
        cli::Commands::Versions(args) => {
            cli::versions::run(&args, &cli.data_dir, cli.format)?;
        }
        cli::Commands::Activate(args) => {
            cli::versions::run_activate(&args, &cli.data_dir, cli.format)?;
        }
        cli::Commands::Delete(args) => {
            cli::versions::run_delete(&args, &cli.data_dir, cli.format)?;
        }
        cli::Commands::Serve(args) => {
            web::server::run(args, cli.data_dir)?;
        }
    }

    Ok(())
}
