//! Terminal-based fallback confirmation using crossterm.
//!
//! When diff generation fails, the gateway cannot show a reviewable diff —
//! it degrades to a plain binary confirmation: approve the mutation sight
//! unseen, or reject it. This module renders that prompt in the terminal
//! and waits for a single keypress.
//!
//! Uses crossterm directly — a full TUI is more than a yes/no dialog needs.

use crate::approval::{FallbackConfirm, FallbackPrompt};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::Write;
use std::time::Duration;

/// Terminal-based fallback handler.
/// Shows a prompt and waits for the user to press A/R.
pub struct TerminalConfirm {
    /// How long to wait before rejecting by default (default: 5 minutes)
    timeout: Duration,
}

impl TerminalConfirm {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TerminalConfirm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FallbackConfirm for TerminalConfirm {
    async fn confirm(&self, prompt: &FallbackPrompt) -> Result<bool> {
        // crossterm does synchronous I/O, so run it on a blocking thread
        let prompt = prompt.clone();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || show_confirm_prompt(&prompt, timeout)).await?
    }
}

/// Display the confirmation prompt and wait for a keypress.
fn show_confirm_prompt(prompt: &FallbackPrompt, timeout: Duration) -> Result<bool> {
    let mut stdout = std::io::stdout();

    execute!(
        stdout,
        Print("\n"),
        SetForegroundColor(Color::Yellow),
        Print("╔══════════════════════════════════════════════════════════╗\n"),
        Print("║          ⚠  APPROVAL REQUIRED (no diff available)      ║\n"),
        Print("╠══════════════════════════════════════════════════════════╣\n"),
        ResetColor,
    )?;

    execute!(
        stdout,
        SetForegroundColor(Color::White),
        Print(format!(
            "║  Action:  {:<47}║\n",
            format!("{}", prompt.kind)
        )),
        Print(format!(
            "║  File:    {:<47}║\n",
            truncate(&prompt.file_path, 47)
        )),
        SetForegroundColor(Color::DarkGrey),
        Print(format!(
            "║  Reason:  {:<47}║\n",
            truncate(&prompt.reason, 47)
        )),
    )?;

    execute!(
        stdout,
        SetForegroundColor(Color::Yellow),
        Print("║                                                          ║\n"),
        SetForegroundColor(Color::Green),
        Print("║  [A] Approve    "),
        SetForegroundColor(Color::Red),
        Print("[R] Reject                               "),
        SetForegroundColor(Color::Yellow),
        Print("║\n"),
        Print("╚══════════════════════════════════════════════════════════╝\n"),
        ResetColor,
    )?;
    stdout.flush()?;

    // Raw mode to capture single keystrokes
    terminal::enable_raw_mode()?;

    let approved = loop {
        if event::poll(timeout)? {
            if let Event::Key(KeyEvent { code, .. }) = event::read()? {
                match code {
                    KeyCode::Char('a') | KeyCode::Char('A') => break true,
                    KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::Esc => break false,
                    _ => continue,
                }
            }
        } else {
            // Timeout — reject by default
            break false;
        }
    };

    terminal::disable_raw_mode()?;

    if approved {
        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("\n  ✓ Approved\n\n"),
            ResetColor,
        )?;
    } else {
        execute!(
            stdout,
            SetForegroundColor(Color::Red),
            Print("\n  ✗ Rejected\n\n"),
            ResetColor,
        )?;
    }
    stdout.flush()?;

    Ok(approved)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}

/// Auto-approve handler (for testing and headless runs).
pub struct AutoApprove;

#[async_trait]
impl FallbackConfirm for AutoApprove {
    async fn confirm(&self, _prompt: &FallbackPrompt) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-reject handler (for strict headless mode).
pub struct AutoDeny;

#[async_trait]
impl FallbackConfirm for AutoDeny {
    async fn confirm(&self, _prompt: &FallbackPrompt) -> Result<bool> {
        Ok(false)
    }
}
