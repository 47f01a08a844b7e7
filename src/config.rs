// Global configuration constants - single source of truth

use crate::snapshot::Bucket;

pub struct Config;

impl Config {
    // Archive host
    pub const SITE_BASE: &'static str = "https://archive.org";
    pub const DOWNLOAD_BASE: &'static str = "https://archive.org/download/";
    pub const METADATA_COLLECTION: &'static str = "playdrone-metadata";
    pub const APK_COLLECTION: &'static str = "playdrone-apk";

    // Snapshot discovery
    pub const MIN_MANIFEST_ENTRIES: usize = 50;
    pub const DEFAULT_BUCKETS: u16 = 1;
    pub const MAX_BUCKETS: u16 = 256;

    // Filters applied by the passes
    pub const SAVE_MIN_DOWNLOADS: i64 = 10_000;
    pub const DOWNLOAD_MIN_DOWNLOADS: i64 = 500_000;

    // HTTP
    pub const USER_AGENT: &'static str = "PlaydroneArchiver/0.1";
    pub const TIMEOUT_SECS: u64 = 60;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    // Local files
    pub const APKS_DB: &'static str = "apks.db";
    pub const CACHE_DB: &'static str = "cache.db";
    pub const APK_DIR: &'static str = "apks";
    pub const APK_SUFFIX: &'static str = ".apk";
}

/// Which metadata columns a run extracts and stores.
///
/// `Full` keeps price and installed size, `Compact` drops both and never
/// reads them from the metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SchemaMode {
    #[default]
    Full,
    Compact,
}

/// Immutable runtime configuration handed to every component.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Site root used for search listings and detail pages.
    pub site_base: String,
    /// Root of `<snapshot>/<file>` downloads. Always ends with `/`.
    pub download_base: String,
    pub metadata_collection: String,
    pub apk_collection: String,
    /// Snapshots whose detail page lists this many rows or fewer are rejected.
    pub min_manifest_entries: usize,
    pub buckets: Vec<Bucket>,
    pub mode: SchemaMode,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            site_base: Config::SITE_BASE.to_string(),
            download_base: Config::DOWNLOAD_BASE.to_string(),
            metadata_collection: Config::METADATA_COLLECTION.to_string(),
            apk_collection: Config::APK_COLLECTION.to_string(),
            min_manifest_entries: Config::MIN_MANIFEST_ENTRIES,
            buckets: Bucket::range(Config::DEFAULT_BUCKETS),
            mode: SchemaMode::default(),
            user_agent: Config::USER_AGENT.to_string(),
            timeout_secs: Config::TIMEOUT_SECS,
        }
    }
}

impl ArchiveConfig {
    /// Normalize base URLs so the URL builders can concatenate blindly.
    pub fn normalized(mut self) -> Self {
        while self.site_base.ends_with('/') {
            self.site_base.pop();
        }
        if !self.download_base.ends_with('/') {
            self.download_base.push('/');
        }
        self
    }

    /// Search listing sorted by publication date, used only for the page count.
    pub fn search_index_url(&self) -> String {
        format!(
            "{}/search.php?query=collection%3A{}&sort=-publicdate",
            self.site_base, self.metadata_collection
        )
    }

    /// One page of the date-sorted search listing (pages are 1-based).
    pub fn search_page_url(&self, page: u32) -> String {
        format!(
            "{}/search.php?query=collection%3A{}&sort=-date&page={}",
            self.site_base, self.metadata_collection, page
        )
    }

    /// Detail page for a listing link such as `/details/<snapshot>`.
    pub fn detail_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.site_base, href)
        }
    }

    pub fn manifest_url(&self, snapshot: &str) -> String {
        format!("{}{}/{}_files.xml", self.download_base, snapshot, snapshot)
    }

    pub fn metadata_url(&self, snapshot: &str, app_id: &str) -> String {
        format!("{}{}/{}.json", self.download_base, snapshot, app_id)
    }

    pub fn apk_url(&self, bucket: &str, app_id: &str, version_code: i64) -> String {
        format!(
            "{}{}-{}/{}-{}.apk",
            self.download_base, self.apk_collection, bucket, app_id, version_code
        )
    }
}
