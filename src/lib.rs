pub mod apk;
pub mod archiver;
pub mod cli;
pub mod config;
pub mod locator;
pub mod logging;
pub mod manifest;
pub mod memory;
pub mod metadata;
pub mod network;
pub mod organizer;
pub mod parser;
pub mod snapshot;
pub mod source;
pub mod store;

// Re-export main types for library usage
pub use archiver::{Archiver, ArchiveError, PassStats};
pub use config::{ArchiveConfig, SchemaMode};
pub use locator::{LocatorReport, SnapshotLocator};
pub use metadata::{AppInfo, FetchOutcome, SkipReason};
pub use network::{FetchError, HttpClient};
pub use snapshot::{Bucket, SnapshotName};
pub use source::ArchiveSource;
pub use store::{RecordStore, StoreLayout};
