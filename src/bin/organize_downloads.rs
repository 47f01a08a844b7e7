// Divides downloaded APKs into folders by download count.
// The downloads must have been done first.

use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use playdrone_archiver::cli::{usage_exit_code, OrganizeCli};
use playdrone_archiver::config::SchemaMode;
use playdrone_archiver::logging::init_logging;
use playdrone_archiver::organizer::{organize, MissingRecordPolicy, OrganizeError};
use playdrone_archiver::store::{RecordStore, StoreLayout};

fn run(cli: &OrganizeCli) -> Result<(), OrganizeError> {
    // Only the name and ndownload columns are read, which both layouts share.
    let store = RecordStore::open(&cli.db, StoreLayout::Columns(SchemaMode::Full))?;
    let policy = if cli.strict {
        MissingRecordPolicy::Abort
    } else {
        MissingRecordPolicy::Skip
    };
    organize(&store, &cli.download_dir, policy)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = match OrganizeCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            if let Err(io) = e.print() {
                eprintln!("Failed to print usage: {}", io);
            }
            if code != 0 {
                eprintln!("Usage: organize_downloads <apks.db> <downloadFolder>");
            }
            return ExitCode::from(code);
        }
    };

    let _guard = match init_logging(None, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
