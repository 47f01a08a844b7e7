//! Per-application metadata records and the fields kept from them.
//!
//! A record is the JSON document the archive stores as `<snapshot>/<id>.json`.
//! Only a handful of fields are extracted:
//! - `details.app_details.version_code`
//! - `details.app_details.app_category[0]`
//! - `offer[0].micros` (price in native currency × 10^6, full mode only)
//! - `details.app_details.installation_size` (full mode only)
//! - `details.app_details.num_downloads` (e.g. `"1,000,000+"`)

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ArchiveConfig, SchemaMode};
use crate::network::FetchError;
use crate::snapshot::SnapshotName;
use crate::source::ArchiveSource;

const VERSION_CODE: &str = "/details/app_details/version_code";
const CATEGORY: &str = "/details/app_details/app_category/0";
const MICROS: &str = "/offer/0/micros";
const INSTALLED_SIZE: &str = "/details/app_details/installation_size";
const NUM_DOWNLOADS: &str = "/details/app_details/num_downloads";

/// Fields kept for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub version_code: i64,
    pub category: String,
    pub micros: Option<i64>,
    pub installed_size: Option<i64>,
    pub downloads: i64,
}

impl AppInfo {
    /// Extract the kept fields from a metadata record.
    pub fn from_json(record: &Value, mode: SchemaMode) -> Result<Self, SkipReason> {
        let version_code = record
            .pointer(VERSION_CODE)
            .and_then(Value::as_i64)
            .ok_or(SkipReason::MissingField(VERSION_CODE))?;

        let category = record
            .pointer(CATEGORY)
            .and_then(Value::as_str)
            .ok_or(SkipReason::MissingField(CATEGORY))?
            .to_string();

        let downloads = record
            .pointer(NUM_DOWNLOADS)
            .and_then(Value::as_str)
            .and_then(parse_download_count)
            .ok_or(SkipReason::MissingField(NUM_DOWNLOADS))?;

        let (micros, installed_size) = match mode {
            SchemaMode::Full => (
                Some(integer_field(record, MICROS)?),
                Some(integer_field(record, INSTALLED_SIZE)?),
            ),
            SchemaMode::Compact => (None, None),
        };

        Ok(Self {
            version_code,
            category,
            micros,
            installed_size,
            downloads,
        })
    }
}

/// Integer field that the record may carry either as a number or as a numeric string.
fn integer_field(record: &Value, pointer: &'static str) -> Result<i64, SkipReason> {
    let value = match record.pointer(pointer) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    value.ok_or(SkipReason::MissingField(pointer))
}

/// Parse a formatted download count such as `"1,000,000+"`.
///
/// One trailing qualifier character is dropped and thousands separators are
/// removed before parsing.
pub fn parse_download_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let digits = match trimmed.chars().last() {
        Some(c) if !c.is_ascii_digit() => &trimmed[..trimmed.len() - c.len_utf8()],
        _ => trimmed,
    };
    let digits: String = digits.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Why a record was not extracted.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("network error: {0}")]
    Network(#[from] FetchError),

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing or invalid field {0}")]
    MissingField(&'static str),
}

/// Result of fetching one application's metadata.
#[derive(Debug)]
pub enum FetchOutcome {
    Found { info: AppInfo, raw: Value },
    Skipped(SkipReason),
}

impl FetchOutcome {
    pub fn info(&self) -> Option<&AppInfo> {
        match self {
            FetchOutcome::Found { info, .. } => Some(info),
            FetchOutcome::Skipped(_) => None,
        }
    }
}

pub struct MetadataFetcher<'a, S: ArchiveSource + ?Sized> {
    source: &'a S,
    config: &'a ArchiveConfig,
}

impl<'a, S: ArchiveSource + ?Sized> MetadataFetcher<'a, S> {
    pub fn new(source: &'a S, config: &'a ArchiveConfig) -> Self {
        Self { source, config }
    }

    /// Fetch and extract one record. Never fails: problems become `Skipped`.
    pub async fn fetch(&self, snapshot: &SnapshotName, app_id: &str) -> FetchOutcome {
        let url = self.config.metadata_url(&snapshot.to_string(), app_id);
        match self.try_fetch(&url).await {
            Ok((info, raw)) => {
                debug!("Fetched info for {}: {:?}", app_id, info);
                FetchOutcome::Found { info, raw }
            }
            Err(reason) => {
                warn!("Cannot get info {}: {}", url, reason);
                FetchOutcome::Skipped(reason)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<(AppInfo, Value), SkipReason> {
        let body = self.source.fetch_text(url).await?;
        let raw: Value = serde_json::from_str(&body)?;
        let info = AppInfo::from_json(&raw, self.config.mode)?;
        Ok((info, raw))
    }
}
