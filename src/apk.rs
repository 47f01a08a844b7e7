use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{ArchiveConfig, Config};
use crate::network::FetchError;
use crate::source::ArchiveSource;

/// APK collection bucket for an application: the first two hex characters of
/// the SHA-1 of its identifier.
pub fn apk_bucket(app_id: &str) -> String {
    let digest = Sha1::digest(app_id.as_bytes());
    hex::encode(&digest[..1])
}

/// Local file name of a downloaded APK.
pub fn apk_file_name(app_id: &str) -> String {
    format!("{}{}", app_id, Config::APK_SUFFIX)
}

/// Result of one APK download attempt.
#[derive(Debug)]
pub enum DownloadOutcome {
    Saved { path: PathBuf, bytes: u64 },
    Failed { url: String, error: FetchError },
}

pub struct ApkFetcher<'a, S: ArchiveSource + ?Sized> {
    source: &'a S,
    config: &'a ArchiveConfig,
}

impl<'a, S: ArchiveSource + ?Sized> ApkFetcher<'a, S> {
    pub fn new(source: &'a S, config: &'a ArchiveConfig) -> Self {
        Self { source, config }
    }

    pub fn url_for(&self, app_id: &str, version_code: i64) -> String {
        self.config
            .apk_url(&apk_bucket(app_id), app_id, version_code)
    }

    /// Download one APK into `out_dir/<id>.apk`.
    ///
    /// The body is written to a `.part` file first so a failed transfer never
    /// leaves a truncated APK behind.
    pub async fn download(&self, app_id: &str, version_code: i64, out_dir: &Path) -> DownloadOutcome {
        let url = self.url_for(app_id, version_code);
        let path = out_dir.join(apk_file_name(app_id));
        let part = out_dir.join(format!("{}.part", apk_file_name(app_id)));
        debug!("Download {} to {}", url, path.display());

        let result = match self.source.download(&url, &part).await {
            Ok(bytes) => tokio::fs::rename(&part, &path)
                .await
                .map(|_| bytes)
                .map_err(FetchError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(bytes) => DownloadOutcome::Saved { path, bytes },
            Err(error) => {
                if let Err(e) = tokio::fs::remove_file(&part).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Cannot remove partial download {}: {}", part.display(), e);
                    }
                }
                warn!("Cannot download {} to {}: {}", url, path.display(), error);
                DownloadOutcome::Failed { url, error }
            }
        }
    }
}
