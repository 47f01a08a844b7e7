use playdrone_archiver::apk::apk_bucket;
use playdrone_archiver::memory::MemoryArchive;
use playdrone_archiver::archiver::min_downloads;
use playdrone_archiver::organizer::{organize, MissingRecordPolicy};
use playdrone_archiver::*;
use serde_json::json;
use tempfile::TempDir;

const SNAPSHOT: &str = "playdrone-metadata-2014-10-31-00";

fn config(mode: SchemaMode) -> ArchiveConfig {
    ArchiveConfig {
        site_base: "https://archive.test".to_string(),
        download_base: "https://archive.test/download/".to_string(),
        min_manifest_entries: 2,
        buckets: Bucket::range(2),
        mode,
        ..ArchiveConfig::default()
    }
}

fn record(version_code: i64, downloads: &str) -> String {
    json!({
        "details": {
            "app_details": {
                "version_code": version_code,
                "app_category": ["GAME"],
                "installation_size": 4096,
                "num_downloads": downloads
            }
        },
        "offer": [{ "micros": 0 }]
    })
    .to_string()
}

/// One valid snapshot for bucket 00; bucket 01 is never published.
fn archive(config: &ArchiveConfig) -> MemoryArchive {
    let manifest = r#"<files>
        <file name="com.big.json" source="original"/>
        <file name="com.mid.json" source="original"/>
        <file name="com.small.json" source="original"/>
        <file name="com.broken.json" source="original"/>
        <file name="com.gone.json" source="original"/>
        <file name="playdrone-metadata-2014-10-31-00_meta.xml" source="metadata"/>
    </files>"#;

    let detail = "<table><tr><td class=\"ttl\">a</td></tr><tr><td class=\"ttl\">b</td></tr>\
                  <tr><td class=\"ttl\">c</td></tr></table>";

    MemoryArchive::new()
        .with(config.search_index_url(), "<html><body>no pager</body></html>")
        .with(
            config.search_page_url(1),
            format!("<a class=\"titleLink\" href=\"/details/{}\">set</a>", SNAPSHOT),
        )
        .with(format!("https://archive.test/details/{}", SNAPSHOT), detail)
        .with(config.manifest_url(SNAPSHOT), manifest)
        .with(config.metadata_url(SNAPSHOT, "com.big"), record(30, "1,000,000+"))
        .with(config.metadata_url(SNAPSHOT, "com.mid"), record(20, "10,000+"))
        .with(config.metadata_url(SNAPSHOT, "com.small"), record(10, "500+"))
        .with(config.metadata_url(SNAPSHOT, "com.broken"), "{\"details\":")
        .with(
            config.apk_url(&apk_bucket("com.big"), "com.big", 30),
            b"big apk".to_vec(),
        )
}

#[tokio::test]
async fn test_locate_reports_missing_bucket() {
    let config = config(SchemaMode::Full);
    let archive = archive(&config);

    let report = Archiver::new(&archive, &config).locate().await.unwrap();

    assert_eq!(report.located.len(), 1);
    assert_eq!(report.located[&Bucket(0)].to_string(), SNAPSHOT);
    assert_eq!(report.missing, vec![Bucket(1)]);
}

#[tokio::test]
async fn test_save_applies_filter() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("apks.db");
    let config = config(SchemaMode::Full);
    let archive = archive(&config);

    let stats = Archiver::new(&archive, &config)
        .save(&db, min_downloads(10_000))
        .await
        .unwrap();

    assert_eq!(
        stats,
        PassStats {
            seen: 5,
            stored: 2,
            skipped: 2,
            filtered: 1,
        }
    );

    let store = RecordStore::open(&db, StoreLayout::Columns(SchemaMode::Full)).unwrap();
    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(store.names().unwrap(), vec!["com.big", "com.mid"]);
    assert_eq!(store.downloads_for("com.small").unwrap(), None);

    let big = store.get_info("com.big").unwrap().unwrap();
    assert_eq!(big.version_code, 30);
    assert_eq!(big.downloads, 1_000_000);
    assert_eq!(big.micros, Some(0));
    assert_eq!(big.installed_size, Some(4096));
}

#[tokio::test]
async fn test_save_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("apks.db");
    let config = config(SchemaMode::Compact);
    let archive = archive(&config);
    let archiver = Archiver::new(&archive, &config);

    archiver.save(&db, |_| true).await.unwrap();
    let first = RecordStore::open(&db, StoreLayout::Columns(SchemaMode::Compact))
        .unwrap()
        .names()
        .unwrap();

    archiver.save(&db, |_| true).await.unwrap();
    let second = RecordStore::open(&db, StoreLayout::Columns(SchemaMode::Compact))
        .unwrap()
        .names()
        .unwrap();

    assert_eq!(first, vec!["com.big", "com.mid", "com.small"]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cache_then_convert_matches_save() {
    let dir = TempDir::new().unwrap();
    let cache_db = dir.path().join("cache.db");
    let converted_db = dir.path().join("converted.db");
    let saved_db = dir.path().join("saved.db");
    let config = config(SchemaMode::Full);
    let archive = archive(&config);
    let archiver = Archiver::new(&archive, &config);

    let cached = archiver.cache(&cache_db, min_downloads(10_000)).await.unwrap();
    assert_eq!(cached.stored, 2);

    let requests_before = archive.requests().len();
    let converted = archiver.convert(&cache_db, &converted_db).unwrap();
    assert_eq!(archive.requests().len(), requests_before);
    assert_eq!(converted.seen, 2);
    assert_eq!(converted.stored, 2);

    archiver.save(&saved_db, min_downloads(10_000)).await.unwrap();

    let converted = RecordStore::open(&converted_db, StoreLayout::Columns(SchemaMode::Full)).unwrap();
    let saved = RecordStore::open(&saved_db, StoreLayout::Columns(SchemaMode::Full)).unwrap();
    for name in saved.names().unwrap() {
        assert_eq!(
            converted.get_info(&name).unwrap(),
            saved.get_info(&name).unwrap()
        );
    }
    assert_eq!(converted.count().unwrap(), saved.count().unwrap());
}

#[test]
fn test_convert_skips_rows_missing_full_fields() {
    let dir = TempDir::new().unwrap();
    let cache_db = dir.path().join("cache.db");
    let out_db = dir.path().join("apks.db");
    let config = config(SchemaMode::Full);
    let archive = MemoryArchive::new();

    // A compact record: no offer, no installation size.
    let cache = RecordStore::create_fresh(&cache_db, StoreLayout::Raw).unwrap();
    cache
        .upsert_raw(
            "com.compact",
            &json!({
                "details": {
                    "app_details": {
                        "version_code": 3,
                        "app_category": ["TOOLS"],
                        "num_downloads": "50,000+"
                    }
                }
            }),
        )
        .unwrap();
    drop(cache);

    let stats = Archiver::new(&archive, &config).convert(&cache_db, &out_db).unwrap();

    assert_eq!(
        stats,
        PassStats {
            seen: 1,
            stored: 0,
            skipped: 1,
            filtered: 0,
        }
    );
    let out = RecordStore::open(&out_db, StoreLayout::Columns(SchemaMode::Full)).unwrap();
    assert_eq!(out.count().unwrap(), 0);
    assert!(archive.requests().is_empty());
}

#[tokio::test]
async fn test_convert_refuses_same_store() {
    let dir = TempDir::new().unwrap();
    let cache_db = dir.path().join("cache.db");
    let config = config(SchemaMode::Full);
    let archive = archive(&config);
    let archiver = Archiver::new(&archive, &config);
    archiver.cache(&cache_db, |_| true).await.unwrap();

    let result = archiver.convert(&cache_db, &cache_db);

    assert!(matches!(result, Err(ArchiveError::SameStore(_))));
    assert!(RecordStore::open(&cache_db, StoreLayout::Raw).unwrap().count().unwrap() > 0);
}

#[tokio::test]
async fn test_download_then_organize() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("apks.db");
    let apks = dir.path().join("apks");
    let config = config(SchemaMode::Full);
    let archive = archive(&config);
    let archiver = Archiver::new(&archive, &config);

    archiver.save(&db, min_downloads(10_000)).await.unwrap();

    // com.mid has no APK on the host: logged and skipped.
    let stats = archiver.download(&db, &apks, 10_000).await.unwrap();
    assert_eq!(stats.seen, 2);
    assert_eq!(stats.stored, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(std::fs::read(apks.join("com.big.apk")).unwrap(), b"big apk");
    assert!(!apks.join("com.mid.apk").exists());

    // A stray APK that was never saved stays where it is.
    std::fs::write(apks.join("com.stray.apk"), b"?").unwrap();

    let store = RecordStore::open(&db, StoreLayout::Columns(SchemaMode::Full)).unwrap();
    let report = organize(&store, &apks, MissingRecordPolicy::Skip).unwrap();

    assert_eq!(report.moved, vec![("com.big".to_string(), 1_000_000)]);
    assert_eq!(report.unmatched, vec!["com.stray".to_string()]);
    assert!(apks.join("1000000").join("com.big.apk").is_file());
    assert!(apks.join("com.stray.apk").is_file());
}
