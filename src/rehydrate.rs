//! Context rehydration.
//!
//! Builds a [`ContextBundle`] for a query from four sources, in order:
//!
//! 1. Vector hits from the document store.
//! 2. The active-memory snapshot file, with an age check.
//! 3. Recent telemetry run records, newest first.
//! 4. The org repository index.
//!
//! Rehydration never fails. A source that cannot be read contributes an
//! empty value; the store and the snapshot also record a warning. The
//! telemetry and index sources are informational and degrade silently.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use globset::Glob;
use memory_harness_core::context::{ActiveMemory, ContextBundle, VectorHit};
use memory_harness_core::search;
use memory_harness_core::store::Store;

use crate::config::{Config, RehydrationConfig};
use crate::jsonl_store::JsonlStore;

/// Rehydrate against the store configured in `config`.
pub fn rehydrate(query: &str, top_k: usize, config: &Config) -> ContextBundle {
    let now = Utc::now();
    let mut bundle = ContextBundle::new(query, now);

    match JsonlStore::open(&config.store.path) {
        Ok(store) => add_vector_hits(&mut bundle, &store, top_k),
        Err(e) => {
            tracing::warn!(error = %e, "vector store unavailable");
            bundle.warnings.push(format!("vector store unavailable: {}", e));
        }
    }

    add_state_sources(&mut bundle, &config.rehydration, now);
    bundle
}

/// Rehydrate against an already-open store.
pub fn rehydrate_with_store<S: Store + ?Sized>(
    store: &S,
    query: &str,
    top_k: usize,
    config: &RehydrationConfig,
) -> ContextBundle {
    let now = Utc::now();
    let mut bundle = ContextBundle::new(query, now);
    add_vector_hits(&mut bundle, store, top_k);
    add_state_sources(&mut bundle, config, now);
    bundle
}

fn add_vector_hits<S: Store + ?Sized>(bundle: &mut ContextBundle, store: &S, top_k: usize) {
    let hits = search::query(store, &bundle.query, top_k, None);
    bundle.vector_hits = hits
        .iter()
        .map(|hit| {
            let mut vh = VectorHit::from(hit);
            vh.score = round_to(vh.score, 4);
            vh
        })
        .collect();
}

fn add_state_sources(bundle: &mut ContextBundle, config: &RehydrationConfig, now: DateTime<Utc>) {
    if config.include_active_memory {
        bundle.active_memory =
            load_active_memory(&config.snapshot_path, config.freshness_hours, now);
        if let Some(warning) = &bundle.active_memory.warning {
            tracing::warn!(path = %config.snapshot_path.display(), "{}", warning);
            bundle.warnings.push(warning.clone());
        }
    }

    if config.include_telemetry {
        bundle.recent_runs = load_recent_telemetry(
            &config.telemetry_dir,
            &config.telemetry_pattern,
            config.max_recent_runs,
        );
    }

    if config.include_index {
        bundle.org_repos = load_org_index(&config.index_path);
    }
}

/// Read the snapshot at `path` and measure its age against `now`.
///
/// A snapshot older than `freshness_hours` is still returned in full,
/// with a staleness warning attached.
pub fn load_active_memory(path: &Path, freshness_hours: f64, now: DateTime<Utc>) -> ActiveMemory {
    let mut memory = ActiveMemory::default();

    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            memory.warning = Some(format!("snapshot absent — degraded ({})", path.display()));
            return memory;
        }
        Err(e) => {
            memory.warning = Some(format!("could not read snapshot {}: {}", path.display(), e));
            return memory;
        }
    };

    if let Ok(modified) = meta.modified() {
        let modified: DateTime<Utc> = modified.into();
        let age_hours = (now - modified).num_milliseconds() as f64 / 3_600_000.0;
        memory.age_hours = Some(round_to(age_hours, 2));
        if age_hours > freshness_hours {
            memory.warning = Some(format!(
                "snapshot {} is {:.1}h old (threshold: {}h)",
                path.display(),
                age_hours,
                freshness_hours
            ));
        }
    }

    match fs::read(path) {
        Ok(bytes) => {
            memory.available = true;
            memory.content = String::from_utf8_lossy(&bytes).into_owned();
        }
        Err(e) => {
            memory.warning = Some(format!("could not read snapshot {}: {}", path.display(), e));
        }
    }
    memory
}

/// Parse up to `max_files` run records from `dir`, newest first.
///
/// Only file names matching `pattern` are considered. Files are ordered
/// by modification time before the limit is applied, so an unparsable
/// file still occupies one of the slots.
pub fn load_recent_telemetry(dir: &Path, pattern: &str, max_files: usize) -> Vec<serde_json::Value> {
    let matcher = match Glob::new(pattern) {
        Ok(g) => g.compile_matcher(),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "invalid telemetry pattern");
            return Vec::new();
        }
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<(std::time::SystemTime, std::path::PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| matcher.is_match(entry.file_name()))
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some((meta.modified().ok()?, entry.path()))
        })
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0));

    files
        .into_iter()
        .take(max_files)
        .filter_map(|(_, path)| {
            let raw = fs::read(&path).ok()?;
            match serde_json::from_slice(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unparsable run record");
                    None
                }
            }
        })
        .collect()
}

/// Read the org repository index.
///
/// Accepts a bare JSON list or an object with a `repositories` list.
/// Anything else, including a missing file, yields an empty list.
pub fn load_org_index(path: &Path) -> Vec<serde_json::Value> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_slice::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Array(repos)) => repos,
        Ok(serde_json::Value::Object(mut obj)) => match obj.remove("repositories") {
            Some(serde_json::Value::Array(repos)) => repos,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str, age: Duration) {
        fs::write(path, content).unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    const HOUR: u64 = 3600;

    #[test]
    fn test_absent_snapshot_warns() {
        let tmp = TempDir::new().unwrap();
        let mem = load_active_memory(&tmp.path().join("ACTIVE_MEMORY.md"), 2.0, Utc::now());
        assert!(!mem.available);
        assert!(mem.age_hours.is_none());
        assert!(mem.warning.unwrap().contains("snapshot absent"));
    }

    #[test]
    fn test_fresh_snapshot_no_warning() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ACTIVE_MEMORY.md");
        touch(&path, "state", Duration::from_secs(HOUR));
        let mem = load_active_memory(&path, 2.0, Utc::now());
        assert!(mem.available);
        assert_eq!(mem.content, "state");
        assert!(mem.warning.is_none());
        let age = mem.age_hours.unwrap();
        assert!((0.99..=1.01).contains(&age), "age {}", age);
    }

    #[test]
    fn test_stale_snapshot_warns_but_keeps_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ACTIVE_MEMORY.md");
        touch(&path, "old state", Duration::from_secs(3 * HOUR));
        let mem = load_active_memory(&path, 2.0, Utc::now());
        assert!(mem.available);
        assert_eq!(mem.content, "old state");
        let warning = mem.warning.unwrap();
        assert!(warning.contains("3.0h old"), "{}", warning);
        assert!(warning.contains("threshold: 2h"), "{}", warning);
    }

    #[test]
    fn test_telemetry_newest_first_and_limited() {
        let tmp = TempDir::new().unwrap();
        for i in 0..7u64 {
            touch(
                &tmp.path().join(format!("run-{}.json", i)),
                &json!({"run_id": i}).to_string(),
                Duration::from_secs((10 - i) * 60),
            );
        }
        touch(&tmp.path().join("other.json"), "{}", Duration::ZERO);

        let runs = load_recent_telemetry(tmp.path(), "run-*.json", 5);
        let ids: Vec<u64> = runs.iter().map(|r| r["run_id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![6, 5, 4, 3, 2]);
    }

    #[test]
    fn test_telemetry_skips_unparsable() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("run-new.json"), "{broken", Duration::from_secs(60));
        touch(&tmp.path().join("run-old.json"), r#"{"run_id": "old"}"#, Duration::from_secs(120));

        let runs = load_recent_telemetry(tmp.path(), "run-*.json", 5);
        assert_eq!(runs, vec![json!({"run_id": "old"})]);
    }

    #[test]
    fn test_telemetry_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(load_recent_telemetry(&tmp.path().join("nope"), "run-*.json", 5).is_empty());
    }

    #[test]
    fn test_org_index_shapes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");

        fs::write(&path, r#"[{"name": "a"}, {"name": "b"}]"#).unwrap();
        assert_eq!(load_org_index(&path).len(), 2);

        fs::write(&path, r#"{"repositories": [{"name": "a"}], "generated_at": "x"}"#).unwrap();
        assert_eq!(load_org_index(&path), vec![json!({"name": "a"})]);

        fs::write(&path, r#"{"repos": []}"#).unwrap();
        assert!(load_org_index(&path).is_empty());

        fs::write(&path, "42").unwrap();
        assert!(load_org_index(&path).is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(load_org_index(&path).is_empty());

        assert!(load_org_index(&tmp.path().join("absent.json")).is_empty());
    }

    #[test]
    fn test_rehydrate_unopenable_store_warns() {
        let tmp = TempDir::new().unwrap();
        // A directory where the store file should be cannot be read as a file.
        let store_path = tmp.path().join("store.jsonl");
        fs::create_dir_all(&store_path).unwrap();

        let mut config = Config::default();
        config.store.path = store_path;
        config.rehydration.snapshot_path = tmp.path().join("ACTIVE_MEMORY.md");
        config.rehydration.telemetry_dir = tmp.path().join("telemetry");
        config.rehydration.index_path = tmp.path().join("index.json");

        let bundle = rehydrate("anything", 5, &config);
        assert!(bundle.vector_hits.is_empty());
        assert_eq!(bundle.warnings.len(), 2);
        assert!(bundle.warnings[0].starts_with("vector store unavailable"));
        assert!(bundle.warnings[1].contains("snapshot absent"));
    }

    #[test]
    fn test_toggles_skip_sources() {
        let tmp = TempDir::new().unwrap();
        let config = RehydrationConfig {
            snapshot_path: tmp.path().join("ACTIVE_MEMORY.md"),
            include_active_memory: false,
            include_telemetry: false,
            include_index: false,
            ..Default::default()
        };
        let store = memory_harness_core::store::memory::InMemoryStore::new();
        let bundle = rehydrate_with_store(&store, "q", 5, &config);
        assert!(bundle.warnings.is_empty());
        assert_eq!(bundle.active_memory, ActiveMemory::default());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(2.999, 2), 3.0);
    }
}
