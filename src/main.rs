use clap::Parser;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info};

use playdrone_archiver::archiver::{min_downloads, ArchiveError, Archiver, PassStats};
use playdrone_archiver::cli::{usage_exit_code, Cli, Commands};
use playdrone_archiver::logging::init_logging;
use playdrone_archiver::network::{FetchError, HttpClient};

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] FetchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Parse arguments, printing usage and exiting 1 on anything but help/version.
fn parse_cli() -> Cli {
    Cli::try_parse().unwrap_or_else(|e| {
        let code = usage_exit_code(&e);
        if let Err(io) = e.print() {
            eprintln!("Failed to print usage: {}", io);
        }
        std::process::exit(i32::from(code));
    })
}

async fn run(cli: Cli) -> Result<PassStats, MainError> {
    let config = cli.archive.to_config();
    let http = HttpClient::new(config.user_agent.clone(), config.timeout_secs)?;
    let archiver = Archiver::new(&http, &config);

    let stats = match cli.command {
        Commands::Save { db, min_downloads: min } => {
            info!("Saving metadata of {} bucket(s) into {}", config.buckets.len(), db.display());
            archiver.save(&db, min_downloads(min)).await?
        }
        Commands::Cache { db, min_downloads: min } => {
            info!("Caching metadata of {} bucket(s) into {}", config.buckets.len(), db.display());
            archiver.cache(&db, min_downloads(min)).await?
        }
        Commands::Convert { input, output } => {
            info!("Converting {} into {}", input.display(), output.display());
            archiver.convert(&input, &output)?
        }
        Commands::Download {
            db,
            out_dir,
            min_downloads: min,
        } => {
            info!("Downloading APKs with at least {} downloads", min);
            archiver.download(&db, &out_dir, min).await?
        }
    };

    Ok(stats)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_cli();

    let _guard = match init_logging(cli.log_dir.as_deref(), cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", MainError::Logging(e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(stats) => {
            info!(
                "Done: {} seen, {} stored, {} filtered, {} skipped",
                stats.seen, stats.stored, stats.filtered, stats.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
