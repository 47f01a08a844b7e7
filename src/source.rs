//! Trait implemented by anything that can serve archive documents, so passes
//! run against the live host or an in-memory fixture alike.

use async_trait::async_trait;
use std::path::Path;

use crate::network::{FetchError, HttpClient};

#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetch a text document (HTML listing, XML manifest, JSON record).
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Stream a binary document to `dest`, returning the bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

#[async_trait]
impl ArchiveSource for HttpClient {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url).await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        self.download_to(url, dest).await
    }
}
