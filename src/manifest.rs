//! Snapshot manifests (`<snapshot>_files.xml`) and the per-bucket enumeration
//! of application identifiers they contain.

use async_stream::stream;
use futures_util::stream::Stream;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::pin::Pin;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ArchiveConfig;
use crate::snapshot::SnapshotName;
use crate::source::ArchiveSource;

const RECORD_EXTENSION: &str = ".json";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed manifest XML at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// One application record listed in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub snapshot: SnapshotName,
    pub app_id: String,
}

/// Single-pass stream of manifest entries across snapshots.
pub type EntryStream<'a> = Pin<Box<dyn Stream<Item = ManifestEntry> + Send + 'a>>;

/// Application identifiers of the `.json` files in a manifest, in document order.
///
/// A manifest is a flat `<files>` list of `<file name="...">` elements; every
/// other file type in the snapshot is ignored.
pub fn parse_manifest(xml: &str) -> Result<Vec<String>, ManifestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    loop {
        let event = reader.read_event().map_err(|e| ManifestError::Xml {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(ref element) | Event::Empty(ref element)
                if element.name().as_ref() == b"file" =>
            {
                let name = element
                    .try_get_attribute("name")
                    .map_err(|e| ManifestError::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;

                let Some(name) = name else { continue };
                let name = name.unescape_value().map_err(|e| ManifestError::Xml {
                    position: reader.buffer_position() as u64,
                    message: e.to_string(),
                })?;

                if let Some(app_id) = name.strip_suffix(RECORD_EXTENSION) {
                    if !app_id.is_empty() {
                        ids.push(app_id.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

/// Lazily enumerate every record of every snapshot, one manifest fetch per
/// snapshot. A manifest that cannot be fetched or parsed skips its snapshot.
pub fn entries<'a, S>(
    source: &'a S,
    config: &'a ArchiveConfig,
    snapshots: Vec<SnapshotName>,
) -> EntryStream<'a>
where
    S: ArchiveSource + ?Sized,
{
    Box::pin(stream! {
        for snapshot in snapshots {
            let name = snapshot.to_string();
            let url = config.manifest_url(&name);
            debug!("List set {}", name);

            let xml = match source.fetch_text(&url).await {
                Ok(xml) => xml,
                Err(e) if e.is_not_found() => {
                    warn!("Set {} does not exist", url);
                    continue;
                }
                Err(e) => {
                    warn!("Cannot fetch manifest {}: {}", url, e);
                    continue;
                }
            };

            let ids = match parse_manifest(&xml) {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("Cannot read manifest {}: {}", url, e);
                    continue;
                }
            };

            debug!("Set {} lists {} records", name, ids.len());
            for app_id in ids {
                yield ManifestEntry { snapshot: snapshot.clone(), app_id };
            }
        }
    })
}
