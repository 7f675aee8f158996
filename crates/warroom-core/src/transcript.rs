//! Append-only JSONL transcript backing the message store.
//!
//! One message per line. The file is the only durable state the bus needs:
//! on restart the log is replayed and the id counter recovers as "largest id
//! seen". All writes go through the session's serialization point, so no file
//! locking is required.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use warroom_proto::Message;

/// Errors that can occur during transcript operations.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only JSONL transcript file for a single session.
#[derive(Debug)]
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    /// Creates a transcript log at the given path. The file is created on
    /// first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the path to the transcript file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one message as a JSONL line.
    pub fn append(&self, message: &Message) -> Result<(), TranscriptError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = serde_json::to_string(message)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Replays all messages from the file, in id order.
    ///
    /// Returns an empty vec if the file doesn't exist. Malformed lines are
    /// skipped with a warning rather than failing the whole replay. Lines may
    /// have been hand-edited; id order is authoritative, not file order.
    pub fn replay(&self) -> Result<Vec<Message>, TranscriptError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut messages = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(line) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        error = %e,
                        "Skipping malformed transcript line"
                    );
                }
            }
        }

        messages.sort_by_key(|m| m.id);
        Ok(messages)
    }
}
