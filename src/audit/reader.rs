//! Audit log reader — filter and display session logs.
//!
//! Reads JSONL log files and provides filtering, summarization,
//! and pretty-printing for the `diffgate log` command.

use crate::audit::types::*;
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and queries audit log files.
pub struct AuditReader {
    log_dir: PathBuf,
}

impl AuditReader {
    /// Create a reader using the default log directory.
    pub fn new() -> Result<Self> {
        let log_dir = crate::audit::logger::AuditLogger::log_directory()?;
        Ok(Self { log_dir })
    }

    /// Create a reader for a specific directory (for testing).
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Read all records from a session log file.
    pub fn read_session(&self, session_id: &str) -> Result<Vec<DecisionRecord>> {
        let path = self.log_dir.join(format!("{}.jsonl", session_id));
        self.read_file(&path)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<DecisionRecord>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read log file: {}", path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse log record at line {}", i + 1))
            })
            .collect()
    }

    /// Read records from the most recent session.
    pub fn read_latest_session(&self) -> Result<Vec<DecisionRecord>> {
        match self.find_latest_session()? {
            Some(path) => self.read_file(&path),
            None => Ok(Vec::new()),
        }
    }

    /// Find the most recent session log file.
    fn find_latest_session(&self) -> Result<Option<PathBuf>> {
        if !self.log_dir.exists() {
            return Ok(None);
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "jsonl"))
            .collect();

        // Sort by modification time, most recent first
        entries.sort_by(|a, b| {
            let a_time = fs::metadata(a).and_then(|m| m.modified()).ok();
            let b_time = fs::metadata(b).and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        Ok(entries.into_iter().next())
    }

    /// List all available session IDs.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        if !self.log_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions: Vec<String> = fs::read_dir(&self.log_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "jsonl"))
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
            })
            .collect();

        sessions.sort();
        Ok(sessions)
    }

    /// Filter records based on criteria.
    pub fn filter_records(records: &[DecisionRecord], filter: &LogFilter) -> Vec<DecisionRecord> {
        records
            .iter()
            .filter(|r| {
                if let Some(kind) = filter.kind {
                    if r.kind != kind {
                        return false;
                    }
                }
                if let Some(ref decision) = filter.decision {
                    match decision {
                        DecisionFilter::Approved => {
                            if !r.approved {
                                return false;
                            }
                        }
                        DecisionFilter::Rejected => {
                            if r.approved {
                                return false;
                            }
                        }
                        DecisionFilter::Fallback => {
                            if !r.fallback {
                                return false;
                            }
                        }
                    }
                }
                true
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Generate a summary for a set of records.
    pub fn summarize(records: &[DecisionRecord]) -> SessionSummary {
        let mut summary = SessionSummary::default();

        if let Some(first) = records.first() {
            summary.session_id = first.session_id.clone();
            summary.start_time = Some(first.timestamp);
        }
        if let Some(last) = records.last() {
            summary.end_time = Some(last.timestamp);
        }

        summary.total_decisions = records.len();
        for record in records {
            if record.approved {
                summary.approved += 1;
                if record.approved_hunks.is_some() {
                    summary.partial += 1;
                }
            } else {
                summary.rejected += 1;
            }
            if record.fallback {
                summary.fallbacks += 1;
            }
        }

        summary
    }

    /// Pretty-print a record for terminal display.
    pub fn format_record(record: &DecisionRecord) -> String {
        let timestamp = record.timestamp.format("%H:%M:%S").to_string();
        let decision_str = if record.approved {
            match record.approved_hunks {
                Some(n) => format!("PARTIAL({})", n).yellow().to_string(),
                None => "APPROVED".green().to_string(),
            }
        } else {
            "REJECTED".red().to_string()
        };

        let kind = format!("{}", record.kind);
        let mut line = format!(
            "[{}] {} {} -> {}",
            timestamp.dimmed(),
            decision_str,
            kind.bold(),
            record.path
        );

        if record.fallback {
            line.push_str(&format!(" ({})", "fallback".dimmed()));
        }
        if let Some(ref reason) = record.reject_reason {
            line.push_str(&format!(" ({})", reason.dimmed()));
        }

        line
    }
}
