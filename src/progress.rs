//! Build progress reporting.
//!
//! Reports what `fundreg build` is doing so long rebuilds of the full registry
//! are observable. Progress goes to **stderr** so stdout stays parseable.

use std::io::Write;

/// A single progress event for an index build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildProgressEvent {
    /// Reading the taxonomy (RDF or snapshot).
    Parsing { source: String },
    /// Linking broader/narrower references across `records` concepts.
    Resolving { records: u64 },
    /// `n` of `total` documents handed to the index so far.
    Indexing { n: u64, total: u64 },
    /// A checkpoint commit made the first `n` of `total` documents durable.
    Checkpoint { n: u64, total: u64 },
    /// The final commit landed.
    Done { documents: u64, commits: u64 },
}

/// Reports build progress. Implementations write to stderr (human or JSON).
pub trait BuildProgressReporter: Send + Sync {
    fn report(&self, event: BuildProgressEvent);
}

/// Human-friendly progress on stderr: "build  indexing  10,000 / 31,204 funders".
pub struct StderrProgress;

impl BuildProgressReporter for StderrProgress {
    fn report(&self, event: BuildProgressEvent) {
        let line = match &event {
            BuildProgressEvent::Parsing { source } => format!("build  parsing {}\n", source),
            BuildProgressEvent::Resolving { records } => {
                format!("build  resolving  {} concepts\n", format_number(*records))
            }
            BuildProgressEvent::Indexing { n, total } => format!(
                "build  indexing  {} / {} funders\n",
                format_number(*n),
                format_number(*total)
            ),
            BuildProgressEvent::Checkpoint { n, total } => format!(
                "build  committed {} / {} funders\n",
                format_number(*n),
                format_number(*total)
            ),
            BuildProgressEvent::Done { documents, commits } => format!(
                "build  done  {} funders, {} commits\n",
                format_number(*documents),
                commits
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BuildProgressReporter for JsonProgress {
    fn report(&self, event: BuildProgressEvent) {
        let obj = match &event {
            BuildProgressEvent::Parsing { source } => serde_json::json!({
                "event": "progress",
                "phase": "parsing",
                "source": source
            }),
            BuildProgressEvent::Resolving { records } => serde_json::json!({
                "event": "progress",
                "phase": "resolving",
                "records": records
            }),
            BuildProgressEvent::Indexing { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "indexing",
                "n": n,
                "total": total
            }),
            BuildProgressEvent::Checkpoint { n, total } => serde_json::json!({
                "event": "checkpoint",
                "n": n,
                "total": total
            }),
            BuildProgressEvent::Done { documents, commits } => serde_json::json!({
                "event": "done",
                "documents": documents,
                "commits": commits
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BuildProgressReporter for NoProgress {
    fn report(&self, _event: BuildProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn BuildProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
