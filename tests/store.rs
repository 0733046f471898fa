//! Metadata Store Integration Tests
//!
//! Persistence, deterministic output, and pruning against the real disk.

use std::path::PathBuf;

use curator::domain::{AssetMetrics, LibraryRecord};
use curator::library::{Library, LocalView, MetadataStore};
use tempfile::TempDir;

fn record(key: &str, path: PathBuf) -> LibraryRecord {
    LibraryRecord::new(
        key,
        AssetMetrics {
            path,
            width: 1920,
            height: 800,
            duration_ms: 6_000_000,
            audio_streams: 1,
            audio_bit_rates: vec![384_000],
            subtitle_streams: 2,
        },
    )
}

#[tokio::test]
async fn test_save_is_deterministic() {
    let temp = TempDir::new().unwrap();

    let mut forward = Library::new();
    let mut backward = Library::new();
    let keys = ["tt0000003", "tt0000001", "tt0000002"];
    for key in keys {
        forward.upsert(record(key, PathBuf::from(format!("/lib/{}.mkv", key))));
    }
    for key in keys.iter().rev() {
        backward.upsert(record(key, PathBuf::from(format!("/lib/{}.mkv", key))));
    }

    let a = MetadataStore::new(temp.path().join("a.json"));
    let b = MetadataStore::new(temp.path().join("b.json"));
    a.save(&forward).await.unwrap();
    b.save(&backward).await.unwrap();
    a.save(&forward).await.unwrap();

    let a_bytes = std::fs::read(a.path()).unwrap();
    let b_bytes = std::fs::read(b.path()).unwrap();
    assert_eq!(a_bytes, b_bytes);
}

#[tokio::test]
async fn test_store_uses_probe_field_names() {
    let temp = TempDir::new().unwrap();
    let store = MetadataStore::new(temp.path().join("library.json"));

    let mut library = Library::new();
    library.upsert(record("tt0113277", PathBuf::from("/lib/Heat.1995/Heat.1995.mkv")));
    store.save(&library).await.unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    let entry = &json["tt0113277"];
    assert_eq!(entry["File"], "/lib/Heat.1995/Heat.1995.mkv");
    assert_eq!(entry["TotalMilliseconds"], 6_000_000);
    assert_eq!(entry["Subtitle"], 2);
}

#[tokio::test]
async fn test_prune_against_disk() {
    let temp = TempDir::new().unwrap();
    let present = temp.path().join("present.mkv");
    std::fs::write(&present, b"x").unwrap();

    let mut library = Library::new();
    library.upsert(record("tt1", present.clone()));
    library.upsert(record("tt2", temp.path().join("gone.mkv")));

    let (pruned, removed) = library.prune(&LocalView);
    assert_eq!(pruned.len(), 1);
    assert_eq!(pruned.get("tt1").unwrap().canonical_path(), present);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].key, "tt2");
}

#[tokio::test]
async fn test_empty_file_loads_empty_library() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("library.json");
    std::fs::write(&path, "").unwrap();

    let library = MetadataStore::new(&path).load().await.unwrap();
    assert!(library.is_empty());
}
