//! Console transcript sinks.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::events::PumpEvent;

pub trait Logger {
    /// One console line tagged with its severity name.
    fn line(&self, severity: &str, line: &str);

    fn log(&self, event: &PumpEvent) {
        let tag = event.severity().as_str();
        for line in event.lines() {
            self.line(tag, &line);
        }
    }
}

/// Appends console lines to a plain-text file as `[severity] line`.
///
/// Write failures are reported through `tracing` and otherwise ignored; the
/// transcript never interrupts an infusion.
pub struct FileLogger {
    path: PathBuf,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Logger for FileLogger {
    fn line(&self, severity: &str, line: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "[{severity}] {line}"));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "transcript write failed");
        }
    }
}
