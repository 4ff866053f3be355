//! File-backed log sink, the bundled observer implementation.
//!
//! The engine only depends on the [`Observer`] contract; this sink is an
//! ordinary consumer of it and lives outside the core on purpose.

use std::io::Write;
use std::path::{Path, PathBuf};

use keywatch_common::types::KeyEvent;
use keywatch_core::observer::Observer;

/// Appends one line per key event to a log file.
///
/// Lines have the form `Key: <code>, Event: <phase>`. The file is opened
/// per event and closed again, so a sink failure at any point loses at
/// most one line. Write failures are logged, never propagated: the sink
/// must not disturb the dispatch loop. Errors reported by the tracker go
/// to stderr, a separate channel from the event log.
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    /// Creates a sink writing to `path`.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn append(&self, line: &str) {
        let opened = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path);
        let result = opened.and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            tracing::error!(path = %self.path.display(), error = %e, "log sink write failed");
        }
    }
}

impl Observer for FileLogSink {
    fn on_event(&self, event: &KeyEvent) {
        self.append(&format!("Key: {}, Event: {}", event.code, event.phase));
    }

    fn on_complete(&self) {
        self.append("Tracking complete");
        eprintln!("Event tracking finished.");
    }

    fn on_error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}
