use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ArchiveConfig, Config, SchemaMode};
use crate::snapshot::Bucket;

/// Command line for the archive crawler.
/// Exit codes: 0=success, 1=usage error or failed pass
#[derive(Parser, Debug)]
#[command(name = "playdrone_archiver")]
#[command(about = "Download metadata and APKs from the playdrone archives")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub archive: ArchiveArgs,

    #[arg(long, global = true, help = "Also write rotating log files to this directory")]
    pub log_dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Log debug output when RUST_LOG is unset")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save extracted metadata directly into the column store.
    Save {
        #[arg(long, default_value = Config::APKS_DB, help = "Column store to recreate")]
        db: PathBuf,

        #[arg(
            long,
            default_value_t = Config::SAVE_MIN_DOWNLOADS,
            help = "Only keep applications with at least this many downloads"
        )]
        min_downloads: i64,
    },

    /// Save the raw metadata JSON into a key/value store.
    Cache {
        #[arg(long, default_value = Config::CACHE_DB, help = "Raw store to recreate")]
        db: PathBuf,

        #[arg(
            long,
            default_value_t = Config::SAVE_MIN_DOWNLOADS,
            help = "Only keep applications with at least this many downloads"
        )]
        min_downloads: i64,
    },

    /// Rebuild the column store from a raw store without network access.
    Convert {
        #[arg(long = "in", default_value = Config::CACHE_DB, help = "Raw store to read")]
        input: PathBuf,

        #[arg(long = "out", default_value = Config::APKS_DB, help = "Column store to recreate")]
        output: PathBuf,
    },

    /// Download the APKs of the stored applications.
    Download {
        #[arg(long, default_value = Config::APKS_DB, help = "Column store to read")]
        db: PathBuf,

        #[arg(long, default_value = Config::APK_DIR, help = "Directory receiving <id>.apk files")]
        out_dir: PathBuf,

        #[arg(
            long,
            default_value_t = Config::DOWNLOAD_MIN_DOWNLOADS,
            help = "Only download applications with at least this many downloads"
        )]
        min_downloads: i64,
    },
}

/// Archive host and run settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    #[arg(long, global = true, default_value = Config::SITE_BASE, help = "Archive site root")]
    pub site_base: String,

    #[arg(long, global = true, default_value = Config::DOWNLOAD_BASE, help = "Archive download root")]
    pub download_base: String,

    #[arg(long, global = true, default_value = Config::METADATA_COLLECTION)]
    pub metadata_collection: String,

    #[arg(long, global = true, default_value = Config::APK_COLLECTION)]
    pub apk_collection: String,

    #[arg(
        long,
        global = true,
        default_value_t = Config::DEFAULT_BUCKETS,
        value_parser = clap::value_parser!(u16).range(0..=Config::MAX_BUCKETS as i64),
        help = "Crawl buckets 0..N of the metadata collection"
    )]
    pub buckets: u16,

    #[arg(
        long,
        global = true,
        default_value_t = Config::MIN_MANIFEST_ENTRIES,
        help = "Reject snapshots listing this many files or fewer"
    )]
    pub min_manifest_entries: usize,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = SchemaMode::Full,
        help = "full keeps price and size columns, compact drops them"
    )]
    pub mode: SchemaMode,

    #[arg(long, global = true, default_value = Config::USER_AGENT)]
    pub user_agent: String,

    #[arg(long, global = true, default_value_t = Config::TIMEOUT_SECS, help = "Request timeout in seconds")]
    pub timeout: u64,
}

impl ArchiveArgs {
    pub fn to_config(&self) -> ArchiveConfig {
        ArchiveConfig {
            site_base: self.site_base.clone(),
            download_base: self.download_base.clone(),
            metadata_collection: self.metadata_collection.clone(),
            apk_collection: self.apk_collection.clone(),
            min_manifest_entries: self.min_manifest_entries,
            buckets: Bucket::range(self.buckets),
            mode: self.mode,
            user_agent: self.user_agent.clone(),
            timeout_secs: self.timeout,
        }
        .normalized()
    }
}

/// Exit status for a failed parse: 0 when help or version was asked for,
/// 1 for any usage error.
pub fn usage_exit_code(error: &clap::Error) -> u8 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// Command line of the organizer: `organize_downloads <apks.db> <downloadFolder>`.
#[derive(Parser, Debug)]
#[command(name = "organize_downloads")]
#[command(about = "Move downloaded APKs into directories named by download count")]
#[command(version)]
pub struct OrganizeCli {
    /// Column store written by `playdrone_archiver save` or `convert`
    pub db: PathBuf,

    /// Directory holding the downloaded <id>.apk files
    pub download_dir: PathBuf,

    #[arg(long, help = "Fail without moving anything if a file has no store record")]
    pub strict: bool,

    #[arg(short, long, help = "Log debug output when RUST_LOG is unset")]
    pub verbose: bool,
}
