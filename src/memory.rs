//! In-memory archive host that serves canned documents by URL.
//!
//! A test double: lets passes run offline against recorded listings and
//! records. Every request is logged so callers can assert on what was (not)
//! fetched. Production code talks to [`crate::network::HttpClient`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

use crate::network::FetchError;
use crate::source::ArchiveSource;

#[derive(Debug, Default)]
pub struct MemoryArchive {
    documents: HashMap<String, Vec<u8>>,
    statuses: HashMap<String, u16>,
    requests: Mutex<Vec<String>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`, replacing any previous document.
    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> &mut Self {
        self.documents.insert(url.into(), body.into());
        self
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, body);
        self
    }

    /// Answer `url` with an HTTP error status instead of a document.
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.statuses.insert(url.into(), status);
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| *u == url).count()
    }

    fn lookup(&self, url: &str) -> Result<&[u8], FetchError> {
        self.requests.lock().push(url.to_string());
        if let Some(status) = self.statuses.get(url) {
            return Err(FetchError::Status(*status));
        }
        self.documents
            .get(url)
            .map(|body| body.as_slice())
            .ok_or(FetchError::Status(404))
    }
}

#[async_trait]
impl ArchiveSource for MemoryArchive {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.lookup(url)?;
        String::from_utf8(body.to_vec()).map_err(|e| FetchError::BodyError(e.to_string()))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let body = self.lookup(url)?.to_vec();
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}
