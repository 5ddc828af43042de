//! `diffgate log` — browse and display the decision audit trail.
//!
//! Shows what happened in a session: every mutation the agent proposed,
//! what was approved (fully or hunk by hunk), what was rejected, and
//! what fell back to a blind confirmation.

use crate::approval::types::ApprovalKind;
use crate::audit::{AuditReader, DecisionFilter, LogFilter};
use anyhow::{Context, Result};
use colored::Colorize;

/// Run the `diffgate log` command.
pub fn run_log(
    session_id: Option<&str>,
    kind_filter: Option<&str>,
    decision_filter: Option<&str>,
    limit: Option<usize>,
    summary_only: bool,
) -> Result<()> {
    let reader = AuditReader::new().context("Failed to initialize log reader")?;

    // Read records
    let records = if let Some(sid) = session_id {
        reader
            .read_session(sid)
            .with_context(|| format!("Failed to read session: {}", sid))?
    } else {
        let records = reader.read_latest_session()?;
        if records.is_empty() {
            println!();
            println!("  {} No audit logs found.", "ℹ".blue());
            println!("  Run the gateway first:");
            println!("    {}", "diffgate serve --workspace <dir>".dimmed());
            println!();
            return Ok(());
        }
        records
    };

    // Apply filters
    let filter = LogFilter {
        kind: kind_filter.and_then(ApprovalKind::from_str_loose),
        decision: decision_filter.map(|d| match d.to_lowercase().as_str() {
            "rejected" | "reject" | "denied" => DecisionFilter::Rejected,
            "fallback" => DecisionFilter::Fallback,
            _ => DecisionFilter::Approved,
        }),
        limit,
    };

    let filtered = AuditReader::filter_records(&records, &filter);

    if summary_only {
        let summary = AuditReader::summarize(&records);
        println!();
        println!("  Session: {}", summary.session_id.cyan());
        println!();
        println!("  {}", summary.one_line());

        if let (Some(start), Some(end)) = (summary.start_time, summary.end_time) {
            let duration = end - start;
            println!("  Duration: {}", format_duration(duration.num_seconds()));
        }
        println!();
    } else {
        println!();
        if let Some(first) = filtered.first() {
            println!("  Session: {}", first.session_id.cyan());
            println!();
        }

        for record in &filtered {
            println!("  {}", AuditReader::format_record(record));
        }

        let summary = AuditReader::summarize(&records);
        println!();
        println!(
            "  {} {}",
            "─".repeat(40).dimmed(),
            summary.one_line().dimmed()
        );
        println!();
    }

    Ok(())
}

/// List available sessions.
pub fn run_log_list() -> Result<()> {
    let reader = AuditReader::new()?;
    let sessions = reader.list_sessions()?;

    if sessions.is_empty() {
        println!();
        println!("  {} No sessions found.", "ℹ".blue());
        println!();
        return Ok(());
    }

    println!();
    println!("  Available sessions:");
    println!();
    for session in &sessions {
        println!("  • {}", session);
    }
    println!();
    println!("  View a session: {}", "diffgate log --session <id>".dimmed());
    println!();

    Ok(())
}

fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
