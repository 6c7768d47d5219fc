//! Chat log - append-only JSONL record of every exchange

use crate::confidence::Confidence;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One completed exchange as it is persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub answer: String,
    pub sources: Vec<Value>,
    pub confidence: Confidence,
}

impl LogRecord {
    /// Stamp a record with the current UTC time.
    pub fn now(question: &str, answer: &str, sources: &[Value], confidence: Confidence) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            question: question.to_string(),
            answer: answer.to_string(),
            sources: sources.to_vec(),
            confidence,
        }
    }

    /// Serialize to a single line including the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self).context("Failed to serialize log record")? + "\n")
    }
}

/// Destination for completed exchanges.
pub trait LogSink {
    fn append(&mut self, record: &LogRecord) -> Result<()>;
}

/// File-backed sink. The file is opened once in append mode; earlier
/// records are never touched.
pub struct ChatLog {
    path: PathBuf,
    file: File,
}

impl ChatLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open chat log {}", path.display()))?;

        info!("Chat log opened: {}", path.display());

        Ok(ChatLog { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for ChatLog {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let line = record.to_line()?;
        append_line(&mut self.file, line.as_bytes())
    }
}

/// What appending needs from the file underneath.
trait LogFile: Write {
    fn current_len(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write one whole line or nothing: a failed write is cut back to the
/// previous end of file so the next record starts on a clean line.
fn append_line<F: LogFile>(file: &mut F, line: &[u8]) -> Result<()> {
    let len = file.current_len().context("Failed to stat chat log")?;
    if let Err(e) = file.write_all(line).and_then(|_| file.flush()) {
        if let Err(undo) = file.truncate_to(len) {
            warn!(error = %undo, "could not remove partial chat log entry");
        }
        return Err(e).context("Failed to write chat log entry");
    }
    file.sync().context("Failed to sync chat log")
}
