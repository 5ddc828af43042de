//! Audit log writer — append-only JSONL files.
//!
//! Writes to `~/.diffgate/logs/{session_id}.jsonl` — one JSON object per
//! line. Flushes after every write for crash safety.

use crate::audit::types::DecisionRecord;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit logger that writes JSONL files.
pub struct AuditLogger {
    /// Path to the log file
    log_path: PathBuf,
    /// Open file handle (kept open for the session lifetime)
    file: File,
    /// Number of records written this session
    record_count: usize,
}

impl AuditLogger {
    /// Create a new logger for a session.
    /// Creates the log directory and file if they don't exist.
    pub fn new(session_id: &str) -> Result<Self> {
        let log_dir = Self::log_directory()?;
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        Self::with_path(log_dir.join(format!("{}.jsonl", session_id)))
    }

    /// Create a logger writing to a specific path (for testing).
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let log_path = path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

        Ok(Self {
            log_path,
            file,
            record_count: 0,
        })
    }

    /// Log a decision. Serializes to JSON and appends to the file.
    /// Flushes immediately for crash safety.
    pub fn log(&mut self, record: &DecisionRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize audit record")?;
        writeln!(self.file, "{}", json).context("Failed to write audit record")?;
        self.file.flush().context("Failed to flush audit log")?;
        self.record_count += 1;
        Ok(())
    }

    /// Get the path to the log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Get the number of records written this session.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Get the default log directory (~/.diffgate/logs/).
    pub fn log_directory() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".diffgate").join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::ApprovalKind;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(path: &str, approved: bool) -> DecisionRecord {
        DecisionRecord {
            timestamp: Utc::now(),
            session_id: "test-session".to_string(),
            request_id: "req-1-abc".to_string(),
            kind: ApprovalKind::Write,
            path: path.to_string(),
            approved,
            approved_hunks: None,
            fallback: false,
            reject_reason: (!approved).then(|| "Rejected by reviewer".to_string()),
            decision_duration_ms: Some(42),
        }
    }

    #[test]
    fn test_write_and_parse_log() {
        let tmp = TempDir::new().unwrap();
        let log_path = tmp.path().join("test.jsonl");
        let mut logger = AuditLogger::with_path(&log_path).unwrap();

        logger.log(&record("src/main.rs", true)).unwrap();
        assert_eq!(logger.record_count(), 1);

        let content = fs::read_to_string(&log_path).unwrap();
        let parsed: DecisionRecord = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed.session_id, "test-session");
        assert_eq!(parsed.path, "src/main.rs");
        assert!(parsed.approved);
    }

    #[test]
    fn test_append_only() {
        let tmp = TempDir::new().unwrap();
        let log_path = tmp.path().join("test.jsonl");
        let mut logger = AuditLogger::with_path(&log_path).unwrap();

        for i in 0..3 {
            logger.log(&record(&format!("file_{}.rs", i), i % 2 == 0)).unwrap();
        }

        assert_eq!(logger.record_count(), 3);

        let content = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 3);
    }
}
