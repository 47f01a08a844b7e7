//! Buckets and dated snapshot names.
//!
//! A snapshot is published as `<collection>-<YYYY-MM-DD>-<xx>` where `xx` is
//! the two-digit hex bucket suffix.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One of the 256 partitions of the application identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket(pub u8);

impl Bucket {
    /// Buckets `0..count`, clamped to the 256 that exist.
    pub fn range(count: u16) -> Vec<Bucket> {
        (0..count.min(256)).map(|b| Bucket(b as u8)).collect()
    }

    /// Two lowercase hex characters, as used in collection names.
    pub fn suffix(&self) -> String {
        format!("{:02x}", self.0)
    }

    pub fn from_suffix(suffix: &str) -> Option<Bucket> {
        if suffix.len() != 2 || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u8::from_str_radix(suffix, 16).ok().map(Bucket)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotParseError {
    #[error("'{0}' does not belong to collection '{1}'")]
    WrongCollection(String, String),

    #[error("'{0}' has no bucket suffix")]
    MissingBucket(String),

    #[error("'{0}' has an invalid bucket suffix")]
    InvalidBucket(String),

    #[error("'{0}' has an invalid date")]
    InvalidDate(String),
}

/// Fully qualified snapshot name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotName {
    pub collection: String,
    pub date: NaiveDate,
    pub bucket: Bucket,
}

impl SnapshotName {
    pub fn new(collection: impl Into<String>, date: NaiveDate, bucket: Bucket) -> Self {
        Self {
            collection: collection.into(),
            date,
            bucket,
        }
    }

    /// Parse a bare identifier (`playdrone-metadata-2014-10-31-c9`) or a listing
    /// link that ends with one (`/details/playdrone-metadata-2014-10-31-c9`).
    pub fn parse(link: &str, collection: &str) -> Result<Self, SnapshotParseError> {
        let identifier = link
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(link);

        let rest = identifier
            .strip_prefix(collection)
            .and_then(|r| r.strip_prefix('-'))
            .ok_or_else(|| {
                SnapshotParseError::WrongCollection(identifier.to_string(), collection.to_string())
            })?;

        let (date, suffix) = rest
            .rsplit_once('-')
            .ok_or_else(|| SnapshotParseError::MissingBucket(identifier.to_string()))?;

        let bucket = Bucket::from_suffix(suffix)
            .ok_or_else(|| SnapshotParseError::InvalidBucket(identifier.to_string()))?;

        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| SnapshotParseError::InvalidDate(identifier.to_string()))?;

        Ok(Self::new(collection, date, bucket))
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.collection,
            self.date.format(DATE_FORMAT),
            self.bucket
        )
    }
}
