//! SQLite record store: a single `apks` table keyed by application identifier.
//!
//! Two layouts share the table name:
//! - columns: `name, version, category, [micros, isize,] ndownload`
//! - raw: `name, json`, the untouched metadata record for later conversion
//!
//! Every write runs in autocommit mode, so each record is durable as soon as
//! the call returns.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::SchemaMode;
use crate::metadata::AppInfo;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store {0} does not exist")]
    Missing(PathBuf),

    #[error("Store uses the {actual:?} layout, {expected} required")]
    Layout {
        expected: &'static str,
        actual: StoreLayout,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    Columns(SchemaMode),
    Raw,
}

impl StoreLayout {
    fn create_sql(&self) -> &'static str {
        match self {
            StoreLayout::Columns(SchemaMode::Full) => {
                "CREATE TABLE apks (
                     name TEXT PRIMARY KEY,
                     version INTEGER,
                     category TEXT,
                     micros INTEGER,
                     isize INTEGER,
                     ndownload INTEGER)"
            }
            StoreLayout::Columns(SchemaMode::Compact) => {
                "CREATE TABLE apks (
                     name TEXT PRIMARY KEY,
                     version INTEGER,
                     category TEXT,
                     ndownload INTEGER)"
            }
            StoreLayout::Raw => {
                "CREATE TABLE apks (
                     name TEXT PRIMARY KEY,
                     json TEXT)"
            }
        }
    }
}

pub struct RecordStore {
    conn: Connection,
    path: PathBuf,
    layout: StoreLayout,
}

impl RecordStore {
    /// Delete whatever is at `path` and create an empty store there.
    pub fn create_fresh<P: AsRef<Path>>(path: P, layout: StoreLayout) -> Result<Self, StoreError> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed stale store {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let conn = Connection::open(path)?;
        conn.execute(layout.create_sql(), [])?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            layout,
        })
    }

    /// Open an existing store written in `layout`.
    pub fn open<P: AsRef<Path>>(path: P, layout: StoreLayout) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::Missing(path.to_path_buf()));
        }

        Ok(Self {
            conn: Connection::open(path)?,
            path: path.to_path_buf(),
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the extracted fields for `name`.
    pub fn upsert_info(&self, name: &str, info: &AppInfo) -> Result<(), StoreError> {
        match self.layout {
            StoreLayout::Columns(SchemaMode::Full) => {
                self.conn.execute(
                    "INSERT OR REPLACE INTO apks VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        name,
                        info.version_code,
                        info.category,
                        info.micros,
                        info.installed_size,
                        info.downloads
                    ],
                )?;
            }
            StoreLayout::Columns(SchemaMode::Compact) => {
                self.conn.execute(
                    "INSERT OR REPLACE INTO apks VALUES (?1, ?2, ?3, ?4)",
                    params![name, info.version_code, info.category, info.downloads],
                )?;
            }
            StoreLayout::Raw => return Err(self.layout_error("columns")),
        }
        Ok(())
    }

    /// Insert or replace the raw metadata record for `name`.
    pub fn upsert_raw(&self, name: &str, record: &serde_json::Value) -> Result<(), StoreError> {
        if self.layout != StoreLayout::Raw {
            return Err(self.layout_error("raw"));
        }
        let json = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO apks VALUES (?1, ?2)",
            params![name, json],
        )?;
        Ok(())
    }

    /// Visit every raw row in insertion order.
    pub fn for_each_raw<F>(&self, mut f: F) -> Result<usize, StoreError>
    where
        F: FnMut(&str, &str) -> Result<(), StoreError>,
    {
        if self.layout != StoreLayout::Raw {
            return Err(self.layout_error("raw"));
        }

        let mut stmt = self.conn.prepare("SELECT name, json FROM apks ORDER BY rowid")?;
        let mut rows = stmt.query([])?;
        let mut visited = 0;
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let json: String = row.get(1)?;
            f(&name, &json)?;
            visited += 1;
        }
        Ok(visited)
    }

    /// `(name, version)` of every application with at least `min_downloads`.
    pub fn download_candidates(&self, min_downloads: i64) -> Result<Vec<(String, i64)>, StoreError> {
        self.require_columns()?;
        let mut stmt = self
            .conn
            .prepare("SELECT name, version FROM apks WHERE ndownload >= ?1 ORDER BY rowid")?;
        let rows = stmt
            .query_map(params![min_downloads], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Download count stored for `name`, if the application is known.
    pub fn downloads_for(&self, name: &str) -> Result<Option<i64>, StoreError> {
        self.require_columns()?;
        let downloads = self
            .conn
            .query_row(
                "SELECT ndownload FROM apks WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(downloads)
    }

    pub fn get_info(&self, name: &str) -> Result<Option<AppInfo>, StoreError> {
        let info = match self.layout {
            StoreLayout::Columns(SchemaMode::Full) => self
                .conn
                .query_row(
                    "SELECT version, category, micros, isize, ndownload FROM apks WHERE name = ?1",
                    params![name],
                    |row| {
                        Ok(AppInfo {
                            version_code: row.get(0)?,
                            category: row.get(1)?,
                            micros: row.get(2)?,
                            installed_size: row.get(3)?,
                            downloads: row.get(4)?,
                        })
                    },
                )
                .optional()?,
            StoreLayout::Columns(SchemaMode::Compact) => self
                .conn
                .query_row(
                    "SELECT version, category, ndownload FROM apks WHERE name = ?1",
                    params![name],
                    |row| {
                        Ok(AppInfo {
                            version_code: row.get(0)?,
                            category: row.get(1)?,
                            micros: None,
                            installed_size: None,
                            downloads: row.get(2)?,
                        })
                    },
                )
                .optional()?,
            StoreLayout::Raw => return Err(self.layout_error("columns")),
        };
        Ok(info)
    }

    /// Application names in insertion order.
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT name FROM apks ORDER BY rowid")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM apks", [], |row| row.get(0))?)
    }

    fn require_columns(&self) -> Result<(), StoreError> {
        match self.layout {
            StoreLayout::Columns(_) => Ok(()),
            StoreLayout::Raw => Err(self.layout_error("columns")),
        }
    }

    fn layout_error(&self, expected: &'static str) -> StoreError {
        StoreError::Layout {
            expected,
            actual: self.layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn info(version_code: i64, downloads: i64) -> AppInfo {
        AppInfo {
            version_code,
            category: "GAME".to_string(),
            micros: Some(0),
            installed_size: Some(2048),
            downloads,
        }
    }

    #[test]
    fn test_create_fresh_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apks.db");
        std::fs::write(&path, b"stale, not even sqlite").unwrap();

        let store = RecordStore::create_fresh(&path, StoreLayout::Columns(SchemaMode::Full)).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::create_fresh(
            dir.path().join("apks.db"),
            StoreLayout::Columns(SchemaMode::Full),
        )
        .unwrap();

        store.upsert_info("com.a", &info(1, 100)).unwrap();
        store.upsert_info("com.a", &info(2, 200)).unwrap();
        store.upsert_info("com.b", &info(7, 700)).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_info("com.a").unwrap(), Some(info(2, 200)));
        assert_eq!(store.downloads_for("com.b").unwrap(), Some(700));
        assert_eq!(store.downloads_for("com.missing").unwrap(), None);
    }

    #[test]
    fn test_compact_layout_drops_price_and_size() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::create_fresh(
            dir.path().join("apks.db"),
            StoreLayout::Columns(SchemaMode::Compact),
        )
        .unwrap();

        store.upsert_info("com.a", &info(3, 30)).unwrap();

        let stored = store.get_info("com.a").unwrap().unwrap();
        assert_eq!(stored.version_code, 3);
        assert_eq!(stored.micros, None);
        assert_eq!(stored.installed_size, None);
    }

    #[test]
    fn test_download_candidates_threshold() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::create_fresh(
            dir.path().join("apks.db"),
            StoreLayout::Columns(SchemaMode::Full),
        )
        .unwrap();

        store.upsert_info("com.small", &info(1, 1_000)).unwrap();
        store.upsert_info("com.edge", &info(2, 500_000)).unwrap();
        store.upsert_info("com.big", &info(3, 5_000_000)).unwrap();

        assert_eq!(
            store.download_candidates(500_000).unwrap(),
            vec![("com.edge".to_string(), 2), ("com.big".to_string(), 3)]
        );
    }

    #[test]
    fn test_raw_rows() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::create_fresh(dir.path().join("cache.db"), StoreLayout::Raw).unwrap();

        store.upsert_raw("com.a", &json!({"k": 1})).unwrap();
        store.upsert_raw("com.b", &json!({"k": 2})).unwrap();

        let mut seen = Vec::new();
        let visited = store
            .for_each_raw(|name, body| {
                seen.push((name.to_string(), serde_json::from_str::<serde_json::Value>(body)?));
                Ok(())
            })
            .unwrap();

        assert_eq!(visited, 2);
        assert_eq!(seen[1], ("com.b".to_string(), json!({"k": 2})));
    }

    #[test]
    fn test_layout_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::create_fresh(dir.path().join("cache.db"), StoreLayout::Raw).unwrap();

        assert!(matches!(
            store.upsert_info("com.a", &info(1, 1)),
            Err(StoreError::Layout { expected: "columns", .. })
        ));
        assert!(matches!(
            store.downloads_for("com.a"),
            Err(StoreError::Layout { .. })
        ));
    }

    #[test]
    fn test_open_missing_store() {
        let dir = TempDir::new().unwrap();
        let result = RecordStore::open(dir.path().join("nope.db"), StoreLayout::Raw);
        assert!(matches!(result, Err(StoreError::Missing(_))));
    }
}
