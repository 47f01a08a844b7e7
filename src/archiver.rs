//! Batch passes over the archive: `save`, `cache`, `convert` and `download`.
//!
//! Every pass is sequential. Per-record problems are logged and skipped;
//! only store and local I/O failures end a pass early.

use futures_util::StreamExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::apk::{ApkFetcher, DownloadOutcome};
use crate::config::ArchiveConfig;
use crate::locator::{LocatorError, LocatorReport, SnapshotLocator};
use crate::manifest;
use crate::metadata::{AppInfo, FetchOutcome, MetadataFetcher, SkipReason};
use crate::source::ArchiveSource;
use crate::store::{RecordStore, StoreError, StoreLayout};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input and output store are the same file: {0}")]
    SameStore(PathBuf),
}

/// Counters reported at the end of a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    /// Records (or rows, or downloads) considered.
    pub seen: usize,
    /// Records written, or files downloaded.
    pub stored: usize,
    /// Records that could not be fetched, parsed or downloaded.
    pub skipped: usize,
    /// Records rejected by the caller's filter.
    pub filtered: usize,
}

pub struct Archiver<'a, S: ArchiveSource + ?Sized> {
    source: &'a S,
    config: &'a ArchiveConfig,
}

impl<'a, S: ArchiveSource + ?Sized> Archiver<'a, S> {
    pub fn new(source: &'a S, config: &'a ArchiveConfig) -> Self {
        Self { source, config }
    }

    /// Find the latest valid snapshot of every configured bucket.
    pub async fn locate(&self) -> Result<LocatorReport, ArchiveError> {
        let report = SnapshotLocator::new(self.source, self.config)
            .locate(&self.config.buckets)
            .await?;
        if !report.missing.is_empty() {
            warn!(
                "Skipping {} bucket(s) without a valid metadata set",
                report.missing.len()
            );
        }
        Ok(report)
    }

    /// Fetch every record and store the extracted fields of those `keep` accepts.
    pub async fn save<F>(&self, db_path: &Path, keep: F) -> Result<PassStats, ArchiveError>
    where
        F: Fn(&AppInfo) -> bool,
    {
        let store = RecordStore::create_fresh(db_path, StoreLayout::Columns(self.config.mode))?;
        self.collect(&store, keep, |store, name, info, _| store.upsert_info(name, info))
            .await
    }

    /// Like `save`, but keeps the whole metadata record for a later `convert`.
    pub async fn cache<F>(&self, db_path: &Path, keep: F) -> Result<PassStats, ArchiveError>
    where
        F: Fn(&AppInfo) -> bool,
    {
        let store = RecordStore::create_fresh(db_path, StoreLayout::Raw)?;
        self.collect(&store, keep, |store, name, _, raw| store.upsert_raw(name, raw))
            .await
    }

    async fn collect<F, W>(&self, store: &RecordStore, keep: F, write: W) -> Result<PassStats, ArchiveError>
    where
        F: Fn(&AppInfo) -> bool,
        W: Fn(&RecordStore, &str, &AppInfo, &Value) -> Result<(), StoreError>,
    {
        let report = self.locate().await?;
        let snapshots = report.located.into_values().collect();
        let fetcher = MetadataFetcher::new(self.source, self.config);
        let mut stats = PassStats::default();

        let mut entries = manifest::entries(self.source, self.config, snapshots);
        while let Some(entry) = entries.next().await {
            stats.seen += 1;
            match fetcher.fetch(&entry.snapshot, &entry.app_id).await {
                FetchOutcome::Found { info, raw } if keep(&info) => {
                    write(store, &entry.app_id, &info, &raw)?;
                    stats.stored += 1;
                    debug!("Inserted {} into {}", entry.app_id, store.path().display());
                }
                FetchOutcome::Found { .. } => {
                    stats.filtered += 1;
                    debug!("Skipped {}", entry.app_id);
                }
                FetchOutcome::Skipped(_) => {
                    stats.skipped += 1;
                    debug!("Skipped {}", entry.app_id);
                }
            }
        }

        info!(
            "Stored {} of {} records in {} ({} filtered, {} unavailable)",
            stats.stored,
            stats.seen,
            store.path().display(),
            stats.filtered,
            stats.skipped
        );
        Ok(stats)
    }

    /// Re-derive a column store from a raw cache store without touching the network.
    pub fn convert(&self, cache_path: &Path, out_path: &Path) -> Result<PassStats, ArchiveError> {
        if same_file(cache_path, out_path) {
            return Err(ArchiveError::SameStore(out_path.to_path_buf()));
        }

        let cache = RecordStore::open(cache_path, StoreLayout::Raw)?;
        let out = RecordStore::create_fresh(out_path, StoreLayout::Columns(self.config.mode))?;
        let mode = self.config.mode;
        let mut stats = PassStats::default();

        cache.for_each_raw(|name, json| {
            stats.seen += 1;
            let extracted = serde_json::from_str::<Value>(json)
                .map_err(SkipReason::from)
                .and_then(|record| AppInfo::from_json(&record, mode));

            match extracted {
                Ok(info) => {
                    out.upsert_info(name, &info)?;
                    stats.stored += 1;
                    debug!("{}: Inserted info for {}", stats.seen, name);
                }
                Err(reason) => {
                    stats.skipped += 1;
                    warn!("Cannot convert {}: {}", name, reason);
                }
            }
            Ok(())
        })?;

        info!(
            "Converted {} of {} cached records into {}",
            stats.stored,
            stats.seen,
            out.path().display()
        );
        Ok(stats)
    }

    /// Download the APK of every stored application with at least `min_downloads`.
    pub async fn download(
        &self,
        db_path: &Path,
        out_dir: &Path,
        min_downloads: i64,
    ) -> Result<PassStats, ArchiveError> {
        let store = RecordStore::open(db_path, StoreLayout::Columns(self.config.mode))?;
        std::fs::create_dir_all(out_dir)?;
        debug!("Using directory {}", out_dir.display());

        let fetcher = ApkFetcher::new(self.source, self.config);
        let mut stats = PassStats::default();

        for (app_id, version_code) in store.download_candidates(min_downloads)? {
            stats.seen += 1;
            debug!("{}: {}", stats.seen, app_id);
            match fetcher.download(&app_id, version_code, out_dir).await {
                DownloadOutcome::Saved { .. } => stats.stored += 1,
                DownloadOutcome::Failed { .. } => stats.skipped += 1,
            }
        }

        info!(
            "Downloaded {} of {} APKs into {}",
            stats.stored,
            stats.seen,
            out_dir.display()
        );
        Ok(stats)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Keep applications with at least `min` downloads.
pub fn min_downloads(min: i64) -> impl Fn(&AppInfo) -> bool {
    move |info| info.downloads >= min
}
