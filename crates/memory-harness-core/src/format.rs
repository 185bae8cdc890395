//! Render a [`ContextBundle`] as a bounded Markdown block.
//!
//! Section order is fixed: header, warnings, memory hits, active-memory
//! excerpt, org repos, recent runs, footer. Sections whose source is empty
//! are omitted.

use crate::context::{truncate_chars, ContextBundle};

/// Characters of hit content shown per excerpt.
const EXCERPT_CHARS: usize = 300;
/// Org repos listed before the overflow line.
const MAX_REPOS: usize = 10;
/// Recent runs summarized.
const MAX_RUNS: usize = 3;

/// Rendering limits and the optional task line.
#[derive(Debug, Clone)]
pub struct FormatOptions<'a> {
    /// Shown as the task; falls back to the bundle's query.
    pub task_description: Option<&'a str>,
    pub max_hits: usize,
    pub max_memory_chars: usize,
}

impl Default for FormatOptions<'_> {
    fn default() -> Self {
        Self {
            task_description: None,
            max_hits: 5,
            max_memory_chars: 2000,
        }
    }
}

/// Format `bundle` for a human or an LLM system prompt.
pub fn format_context(bundle: &ContextBundle, opts: &FormatOptions<'_>) -> String {
    let task = opts
        .task_description
        .filter(|t| !t.is_empty())
        .unwrap_or(bundle.query.as_str());

    let mut parts: Vec<String> = vec![
        "## Rehydrated Working Memory".to_string(),
        String::new(),
        format!("**Task**: {}", task),
        format!("**Rehydrated at**: {}", bundle.rehydrated_at.to_rfc3339()),
        String::new(),
    ];

    for warning in &bundle.warnings {
        parts.push(format!("WARNING: {}", warning));
    }
    if !bundle.warnings.is_empty() {
        parts.push(String::new());
    }

    let hits = &bundle.vector_hits[..bundle.vector_hits.len().min(opts.max_hits)];
    if !hits.is_empty() {
        parts.push("### Relevant Memory Chunks".to_string());
        parts.push(String::new());
        for (i, hit) in hits.iter().enumerate() {
            parts.push(format!("**[{}]** (score: {:.3}) `{}`", i + 1, hit.score, hit.id));
            parts.push(format!("> {}", truncate_chars(&hit.content, EXCERPT_CHARS)));
            parts.push(String::new());
        }
    }

    let memory = &bundle.active_memory;
    if memory.available && !memory.content.is_empty() {
        parts.push("### System State (Active Memory)".to_string());
        parts.push(String::new());
        parts.push("```markdown".to_string());
        parts.push(memory_excerpt(&memory.content, opts.max_memory_chars));
        parts.push("```".to_string());
        parts.push(String::new());
    }

    if !bundle.org_repos.is_empty() {
        parts.push("### Live Org Repos".to_string());
        parts.push(String::new());
        for repo in bundle.org_repos.iter().take(MAX_REPOS) {
            parts.push(repo_line(repo));
        }
        if bundle.org_repos.len() > MAX_REPOS {
            parts.push(format!(
                "- _…and {} more_",
                bundle.org_repos.len() - MAX_REPOS
            ));
        }
        parts.push(String::new());
    }

    if !bundle.recent_runs.is_empty() {
        parts.push("### Recent Pipeline Runs".to_string());
        parts.push(String::new());
        for run in bundle.recent_runs.iter().take(MAX_RUNS) {
            parts.push(run_line(run));
        }
        parts.push(String::new());
    }

    parts.push("---".to_string());
    parts.push("_Context rehydrated from persistent memory._".to_string());
    parts.join("\n")
}

/// First `max_chars` characters of `content`, cut back to the last complete
/// line and marked with `…` when truncated.
fn memory_excerpt(content: &str, max_chars: usize) -> String {
    let excerpt = truncate_chars(content, max_chars);
    if excerpt.len() == content.len() {
        return excerpt.to_string();
    }
    let kept = match excerpt.rfind('\n') {
        Some(idx) => &excerpt[..idx],
        None => excerpt,
    };
    format!("{}\n…", kept)
}

fn repo_line(repo: &serde_json::Value) -> String {
    let name = non_empty_str(repo, "name")
        .or_else(|| non_empty_str(repo, "full_name"))
        .unwrap_or("?");
    let language = repo.get("language").and_then(|v| v.as_str()).unwrap_or("");
    let updated = repo
        .get("updated_at")
        .and_then(|v| v.as_str())
        .map(|s| truncate_chars(s, 10))
        .unwrap_or("");
    format!("- `{}` ({}), updated {}", name, language, updated)
}

fn run_line(run: &serde_json::Value) -> String {
    let run_id = match run.get("run_id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "?".to_string(),
        Some(other) => other.to_string(),
    };
    let ts = run
        .get("timestamp")
        .and_then(|v| v.as_str())
        .map(|s| truncate_chars(s, 19))
        .unwrap_or("");
    let phases = run
        .get("phases")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    let tap = match run.get("metrics").and_then(|m| m.get("tap_passed")) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => "?".to_string(),
    };
    format!("- Run `{}` @ {} | TAP: {} | {}", run_id, ts, tap, phases)
}

fn non_empty_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}
