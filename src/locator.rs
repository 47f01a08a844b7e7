//! Find the latest valid snapshot for each requested bucket.
//!
//! The search listing is sorted newest first, so the first candidate that
//! validates for a bucket is the one we keep. The walk stops when every
//! bucket is filled or the listing runs out of pages.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ArchiveConfig;
use crate::network::FetchError;
use crate::parser;
use crate::snapshot::{Bucket, SnapshotName};
use crate::source::ArchiveSource;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("failed to fetch search index {url}: {source}")]
    Index {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// Outcome of one discovery walk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocatorReport {
    pub located: BTreeMap<Bucket, SnapshotName>,
    /// Requested buckets for which no valid snapshot was found.
    pub missing: Vec<Bucket>,
    pub pages_walked: u32,
}

pub struct SnapshotLocator<'a, S: ArchiveSource + ?Sized> {
    source: &'a S,
    config: &'a ArchiveConfig,
}

impl<'a, S: ArchiveSource + ?Sized> SnapshotLocator<'a, S> {
    pub fn new(source: &'a S, config: &'a ArchiveConfig) -> Self {
        Self { source, config }
    }

    /// Walk the listing until every bucket in `buckets` has a snapshot.
    pub async fn locate(&self, buckets: &[Bucket]) -> Result<LocatorReport, LocatorError> {
        let mut slots: BTreeMap<Bucket, Option<SnapshotName>> =
            buckets.iter().map(|b| (*b, None)).collect();
        let mut remaining = slots.len();
        let mut report = LocatorReport::default();

        if remaining == 0 {
            return Ok(report);
        }

        let total_pages = self.total_pages().await?;
        debug!(total_pages, buckets = remaining, "walking search listing");

        let mut page = 1;
        while remaining > 0 && page <= total_pages {
            let url = self.config.search_page_url(page);
            report.pages_walked = page;
            page += 1;

            let html = match self.source.fetch_text(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Skipping listing page {}: {}", url, e);
                    continue;
                }
            };

            for href in parser::title_links(&html) {
                let candidate = match SnapshotName::parse(&href, &self.config.metadata_collection) {
                    Ok(name) => name,
                    Err(e) => {
                        debug!("Ignoring listing link {}: {}", href, e);
                        continue;
                    }
                };

                // Only unfilled, requested buckets are worth a detail page fetch.
                if !matches!(slots.get(&candidate.bucket), Some(None)) {
                    continue;
                }

                if !self.is_valid(&href).await {
                    continue;
                }

                remaining -= 1;
                info!(
                    "{}: most recent metadata set for bucket {} is dated {}",
                    slots.len() - remaining,
                    candidate.bucket,
                    candidate.date
                );
                slots.insert(candidate.bucket, Some(candidate));

                if remaining == 0 {
                    break;
                }
            }
        }

        for (bucket, slot) in slots {
            match slot {
                Some(name) => {
                    report.located.insert(bucket, name);
                }
                None => {
                    warn!("No valid metadata set found for bucket {}", bucket);
                    report.missing.push(bucket);
                }
            }
        }

        Ok(report)
    }

    async fn total_pages(&self) -> Result<u32, LocatorError> {
        let url = self.config.search_index_url();
        let html = self
            .source
            .fetch_text(&url)
            .await
            .map_err(|source| LocatorError::Index {
                url: url.clone(),
                source,
            })?;

        Ok(parser::last_page(&html).unwrap_or(1))
    }

    /// A snapshot is valid when its detail page lists more than the configured
    /// number of files. Unreachable detail pages count as invalid.
    async fn is_valid(&self, href: &str) -> bool {
        let url = self.config.detail_url(href);
        match self.source.fetch_text(&url).await {
            Ok(html) => {
                let listed = parser::count_listed_files(&html);
                if listed > self.config.min_manifest_entries {
                    true
                } else {
                    debug!("Skipped {} due to insufficient data ({} files)", href, listed);
                    false
                }
            }
            Err(e) => {
                warn!("Cannot check set {}: {}", url, e);
                false
            }
        }
    }
}
