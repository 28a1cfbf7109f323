//! Fetch progress reporting.
//!
//! Reports which tables are being read from the record store and how many
//! records each returned, so users of a slow remote store see that work is
//! happening. Progress is emitted on **stderr** so stdout remains parseable
//! for scripts.

use std::io::Write;

/// A single progress event for a snapshot load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchProgressEvent {
    /// A table listing has started. Total unknown.
    Fetching { table: String },
    /// A table listing finished with `records` rows.
    Fetched { table: String, records: u64 },
}

/// Reports fetch progress. Implementations write to stderr (human or JSON).
pub trait FetchProgressReporter: Send + Sync {
    fn report(&self, event: FetchProgressEvent);
}

/// Human-friendly progress on stderr: "fetch Comments  1,234 records".
pub struct StderrProgress;

impl FetchProgressReporter for StderrProgress {
    fn report(&self, event: FetchProgressEvent) {
        let line = match &event {
            FetchProgressEvent::Fetching { table } => format!("fetch {}  ...\n", table),
            FetchProgressEvent::Fetched { table, records } => {
                format!("fetch {}  {} records\n", table, format_number(*records))
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl FetchProgressReporter for JsonProgress {
    fn report(&self, event: FetchProgressEvent) {
        let obj = match &event {
            FetchProgressEvent::Fetching { table } => serde_json::json!({
                "event": "progress",
                "table": table,
                "phase": "fetching"
            }),
            FetchProgressEvent::Fetched { table, records } => serde_json::json!({
                "event": "progress",
                "table": table,
                "phase": "fetched",
                "records": records
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

impl FetchProgressReporter for NoProgress {
    fn report(&self, _event: FetchProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
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

    pub fn reporter(&self) -> Box<dyn FetchProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
