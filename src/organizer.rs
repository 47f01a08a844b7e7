//! Sort downloaded APKs into directories named after their download count.
//!
//! `apks/com.example.app.apk` becomes `apks/500000/com.example.app.apk` when
//! the store records 500000 downloads for `com.example.app`.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("directory {0} does not exist")]
    MissingDirectory(PathBuf),

    #[error("no store record for {0}")]
    MissingRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What to do with a file whose application is not in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingRecordPolicy {
    /// Leave the file where it is and report it.
    #[default]
    Skip,
    /// Fail the whole run before any file is moved.
    Abort,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizeReport {
    /// `(application, download count)` of every moved file.
    pub moved: Vec<(String, i64)>,
    /// Applications with no store record; their files were not touched.
    pub unmatched: Vec<String>,
}

struct PlannedMove {
    app_id: String,
    from: PathBuf,
    downloads: i64,
}

pub fn organize(
    store: &RecordStore,
    dir: &Path,
    policy: MissingRecordPolicy,
) -> Result<OrganizeReport, OrganizeError> {
    if !dir.is_dir() {
        return Err(OrganizeError::MissingDirectory(dir.to_path_buf()));
    }

    let mut report = OrganizeReport::default();
    let mut plan = Vec::new();

    // Resolve every file first so a strict run fails before touching anything.
    for (app_id, from) in downloaded_apks(dir)? {
        match store.downloads_for(&app_id)? {
            Some(downloads) => plan.push(PlannedMove {
                app_id,
                from,
                downloads,
            }),
            None if policy == MissingRecordPolicy::Abort => {
                return Err(OrganizeError::MissingRecord(app_id));
            }
            None => {
                warn!("No record for {}, leaving {} in place", app_id, from.display());
                report.unmatched.push(app_id);
            }
        }
    }

    for step in plan {
        let target_dir = dir.join(step.downloads.to_string());
        std::fs::create_dir_all(&target_dir)?;

        let file_name = step
            .from
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        let to = target_dir.join(file_name);
        std::fs::rename(&step.from, &to)?;
        debug!("Moved {} to {}", step.from.display(), to.display());

        report.moved.push((step.app_id, step.downloads));
    }

    info!(
        "Organized {} files in {} ({} without a record)",
        report.moved.len(),
        dir.display(),
        report.unmatched.len()
    );
    Ok(report)
}

/// Regular `*.apk` files directly under `dir`, sorted by name.
fn downloaded_apks(dir: &Path) -> Result<Vec<(String, PathBuf)>, std::io::Error> {
    let mut apks = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            debug!("Ignoring non UTF-8 file name {:?}", file_name);
            continue;
        };

        match name.strip_suffix(Config::APK_SUFFIX) {
            Some(app_id) if !app_id.is_empty() => apks.push((app_id.to_string(), entry.path())),
            _ => debug!("Ignoring {}", name),
        }
    }
    apks.sort();
    Ok(apks)
}
