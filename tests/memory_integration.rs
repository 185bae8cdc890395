//! Library-level tests for the persistent store and rehydration.

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use memory_harness::config::{Config, RehydrationConfig};
use memory_harness::jsonl_store::JsonlStore;
use memory_harness::memory::{DocumentStore, UpsertOptions};
use memory_harness::rehydrate::{rehydrate, rehydrate_with_store};
use memory_harness_core::format::{format_context, FormatOptions};
use memory_harness_core::models::Metadata;
use serde_json::json;
use tempfile::TempDir;

fn config_in(root: &Path) -> Config {
    let mut config = Config::default();
    config.store.path = root.join("store.jsonl");
    config.rehydration = RehydrationConfig {
        snapshot_path: root.join("ACTIVE_MEMORY.md"),
        telemetry_dir: root.join("telemetry"),
        index_path: root.join("ORG_REPO_INDEX.json"),
        ..Default::default()
    };
    config
}

fn write_aged(path: &Path, content: &str, age: Duration) {
    fs::write(path, content).unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

#[test]
fn round_trip_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(tmp.path());

    let mut written = Vec::new();
    {
        let mut store = DocumentStore::open(&config).unwrap();
        for i in 0..20 {
            let id = format!("doc-{}", i);
            let content = format!("document number {} about topic {}", i, i % 3);
            store
                .upsert(&id, &content, UpsertOptions::default())
                .unwrap();
            written.push((id, content));
        }
    }

    let store = DocumentStore::open(&config).unwrap();
    assert_eq!(store.count(), written.len());
    for (id, content) in &written {
        assert_eq!(&store.get(id).unwrap().content, content);
    }
}

#[test]
fn idempotent_replace_persists_latest() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(tmp.path());
    let mut store = DocumentStore::open(&config).unwrap();

    store.upsert("id", "version A", UpsertOptions::default()).unwrap();
    store.upsert("other", "unrelated", UpsertOptions::default()).unwrap();
    let before = store.count();
    store.upsert("id", "version B", UpsertOptions::default()).unwrap();
    assert_eq!(store.count(), before);

    let reopened = JsonlStore::open(&config.store.path).unwrap();
    let store = DocumentStore::new(reopened, memory_harness_core::embedding::SparseOnly);
    assert_eq!(store.get("id").unwrap().content, "version B");
}

#[test]
fn corrupt_line_keeps_other_documents() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(tmp.path());
    {
        let mut store = DocumentStore::open(&config).unwrap();
        store.upsert("before", "first", UpsertOptions::default()).unwrap();
        store.upsert("after", "second", UpsertOptions::default()).unwrap();
    }

    let raw = fs::read_to_string(&config.store.path).unwrap();
    let mut lines: Vec<&str> = raw.lines().collect();
    lines.insert(1, "{\"id\": \"broken\", \"content\": ");
    fs::write(&config.store.path, lines.join("\n")).unwrap();

    let store = DocumentStore::open(&config).unwrap();
    assert_eq!(store.count(), 2);
    assert!(store.get("before").is_some());
    assert!(store.get("after").is_some());
    assert!(store.get("broken").is_none());
}

#[test]
fn metadata_filter_excludes_other_tags() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(tmp.path());
    let mut store = DocumentStore::open(&config).unwrap();

    let tagged = |source: &str| UpsertOptions {
        metadata: [("source".to_string(), json!(source))].into_iter().collect(),
        ..Default::default()
    };
    store
        .upsert("y-doc", "autonomous agents govern policy", tagged("y"))
        .unwrap();
    store
        .upsert("x-doc", "weather forecast sunny today", tagged("x"))
        .unwrap();

    let filter: Metadata = [("source".to_string(), json!("x"))].into_iter().collect();
    let hits = store.query("autonomous agents govern policy", 10, Some(&filter));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.id, "x-doc");
    assert_eq!(hits[0].score, 0.0);
}

#[test]
fn freshness_boundary() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(tmp.path());
    let snapshot = &config.rehydration.snapshot_path;

    write_aged(snapshot, "state", Duration::from_secs(3 * 3600));
    let bundle = rehydrate("q", 5, &config);
    assert!(bundle.active_memory.available);
    assert_eq!(bundle.active_memory.content, "state");
    assert_eq!(bundle.warnings.len(), 1);
    assert!(bundle.warnings[0].contains("old"));

    write_aged(snapshot, "state", Duration::from_secs(3600));
    let bundle = rehydrate("q", 5, &config);
    assert!(bundle.warnings.is_empty(), "{:?}", bundle.warnings);
}

#[test]
fn telemetry_most_recent_first() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(tmp.path());
    let dir = &config.rehydration.telemetry_dir;
    fs::create_dir_all(dir).unwrap();

    write_aged(&dir.join("run-a.json"), r#"{"run_id": "a"}"#, Duration::from_secs(300));
    write_aged(&dir.join("run-b.json"), r#"{"run_id": "b"}"#, Duration::from_secs(100));
    write_aged(&dir.join("run-c.json"), r#"{"run_id": "c"}"#, Duration::from_secs(200));
    write_aged(&dir.join("summary.json"), r#"{"run_id": "s"}"#, Duration::ZERO);

    let bundle = rehydrate("q", 5, &config);
    let ids: Vec<&str> = bundle
        .recent_runs
        .iter()
        .map(|r| r["run_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[test]
fn rehydrate_hits_feed_formatter() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(tmp.path());
    let mut store = DocumentStore::open(&config).unwrap();
    store
        .upsert("doc-a", &"autonomous agents govern policy ".repeat(40), UpsertOptions::default())
        .unwrap();
    store
        .upsert("doc-b", "weather forecast sunny today", UpsertOptions::default())
        .unwrap();
    fs::write(
        &config.rehydration.index_path,
        r#"[{"name": "infra", "language": "HCL", "updated_at": "2025-01-02T00:00:00Z"}]"#,
    )
    .unwrap();

    let bundle = rehydrate_with_store(store.store(), "agents policy", 1, &config.rehydration);
    assert_eq!(bundle.vector_hits.len(), 1);
    assert_eq!(bundle.vector_hits[0].id, "doc-a");
    assert_eq!(bundle.vector_hits[0].content.chars().count(), 400);
    assert_eq!(bundle.org_repos.len(), 1);

    let out = format_context(&bundle, &FormatOptions::default());
    assert!(out.contains("`doc-a`"));
    assert!(out.contains("WARNING: snapshot absent"));
    assert!(out.contains("- `infra` (HCL), updated 2025-01-02"));
    assert!(!out.contains("Recent Pipeline Runs"));
}
