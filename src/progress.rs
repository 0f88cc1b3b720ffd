//! Corpus load progress reporting.
//!
//! Reports what is being scanned, read, and parsed while a corpus loads.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a corpus load.
#[derive(Clone, Debug)]
pub enum LoadProgressEvent {
    /// Walking the corpus root. Total unknown.
    Discovering { root: String },
    /// Reading the contents of `files` discovered files.
    Reading { files: u64 },
    /// `n` files parsed out of `total`.
    Parsing { n: u64, total: u64 },
    /// Load finished.
    Loaded { documents: u64, skipped: u64 },
}

/// Reports load progress. Implementations write to stderr (human or JSON).
pub trait LoadProgressReporter: Send + Sync {
    fn report(&self, event: LoadProgressEvent);
}

/// Human-friendly progress on stderr: "load  parsing  120 / 1,500 files".
pub struct StderrProgress;

impl LoadProgressReporter for StderrProgress {
    fn report(&self, event: LoadProgressEvent) {
        let line = match &event {
            LoadProgressEvent::Discovering { root } => {
                format!("load {}  discovering...\n", root)
            }
            LoadProgressEvent::Reading { files } => {
                format!("load  reading  {} files\n", format_number(*files))
            }
            LoadProgressEvent::Parsing { n, total } => format!(
                "load  parsing  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            LoadProgressEvent::Loaded {
                documents,
                skipped,
            } => format!(
                "load  done  {} documents, {} skipped\n",
                format_number(*documents),
                format_number(*skipped)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl LoadProgressReporter for JsonProgress {
    fn report(&self, event: LoadProgressEvent) {
        let obj = match &event {
            LoadProgressEvent::Discovering { root } => serde_json::json!({
                "event": "progress",
                "phase": "discovering",
                "root": root
            }),
            LoadProgressEvent::Reading { files } => serde_json::json!({
                "event": "progress",
                "phase": "reading",
                "files": files
            }),
            LoadProgressEvent::Parsing { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "parsing",
                "n": n,
                "total": total
            }),
            LoadProgressEvent::Loaded {
                documents,
                skipped,
            } => serde_json::json!({
                "event": "loaded",
                "documents": documents,
                "skipped": skipped
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

impl LoadProgressReporter for NoProgress {
    fn report(&self, _event: LoadProgressEvent) {}
}

fn format_number(n: u64) -> String {
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
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
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

    pub fn reporter(&self) -> Box<dyn LoadProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
