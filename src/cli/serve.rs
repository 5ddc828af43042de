//! `diffgate serve` — the main command that runs the approval gateway.
//!
//! This is the core flow:
//! 1. Start the agent server (Unix socket) that accepts proposed mutations
//! 2. Start the surface bridge (Unix socket) that a review surface attaches to
//! 3. Route every proposal through the gateway until interrupted
//! 4. Print session summary

use crate::agent::AgentServer;
use crate::approval::{ApprovalGateway, AutoApprove, AutoDeny, FallbackConfirm, TerminalConfirm};
use crate::audit::AuditLogger;
use crate::surface::SurfaceServer;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Options for the `diffgate serve` command.
#[derive(Debug)]
pub struct ServeOptions {
    /// Workspace directory the gateway diffs against (default: current directory)
    pub workspace: PathBuf,
    /// Agent-facing socket path (default: /tmp/diffgate-<session>-agent.sock)
    pub agent_socket: Option<PathBuf>,
    /// Surface-facing socket path (default: /tmp/diffgate-<session>-surface.sock)
    pub surface_socket: Option<PathBuf>,
    /// Fallback mode when a diff can't be computed: "terminal", "approve", "deny"
    pub fallback_mode: String,
    /// Apply approved content to the workspace on the host side
    pub apply: bool,
    /// Session ID override (default: auto-generated UUID)
    pub session_id: Option<String>,
    /// Disable the audit log
    pub no_audit: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            agent_socket: None,
            surface_socket: None,
            fallback_mode: "terminal".to_string(),
            apply: false,
            session_id: None,
            no_audit: false,
        }
    }
}

/// Run the `diffgate serve` command.
pub async fn run_serve(options: ServeOptions) -> Result<()> {
    let session_id = options
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let workspace = options
        .workspace
        .canonicalize()
        .with_context(|| format!("Workspace not found: {}", options.workspace.display()))?;

    println!();
    println!(
        "  {} Diffgate v{}",
        "◆".to_string().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("  Session:   {}", session_id[..8.min(session_id.len())].cyan());
    println!(
        "  Workspace: {}",
        workspace.display().to_string().cyan()
    );

    // Fallback handler for requests whose diff can't be computed
    let fallback: Arc<dyn FallbackConfirm + Send + Sync> = match options.fallback_mode.as_str() {
        "auto-approve" | "approve" => Arc::new(AutoApprove),
        "auto-deny" | "deny" => Arc::new(AutoDeny),
        _ => Arc::new(TerminalConfirm::new()),
    };

    // Audit logger
    let logger = if options.no_audit {
        None
    } else {
        let logger = AuditLogger::new(&session_id)?;
        println!(
            "  Log:       {}",
            logger.log_path().display().to_string().dimmed()
        );
        Some(logger)
    };

    let short = &session_id[..8.min(session_id.len())];
    let agent_socket = options
        .agent_socket
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("/tmp/diffgate-{}-agent.sock", short)));
    let surface_socket = options
        .surface_socket
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("/tmp/diffgate-{}-surface.sock", short)));

    println!(
        "  Agent:     {}",
        agent_socket.display().to_string().dimmed()
    );
    println!(
        "  Surface:   {}",
        surface_socket.display().to_string().dimmed()
    );
    println!();

    let (gateway, outbound) = ApprovalGateway::new(&workspace, fallback);
    let gateway = Arc::new(gateway);

    let surface_server = SurfaceServer::new(&surface_socket, gateway.clone(), outbound);
    let agent_server = AgentServer::new(
        &agent_socket,
        gateway.clone(),
        &workspace,
        options.apply,
        session_id.clone(),
        logger,
    );

    println!(
        "  {} Waiting for agent and review surface to connect...",
        "→".blue()
    );
    println!("  {}", "Press Ctrl-C to stop".dimmed());
    println!();

    let result = tokio::select! {
        r = agent_server.run() => r,
        r = surface_server.run() => r,
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  {} Shutting down, cancelling pending requests...", "→".blue());
            gateway.dispose().await;
            Ok(())
        }
    };

    if !options.no_audit {
        print_session_summary(&session_id)?;
    }

    // Cleanup sockets
    for socket in [&agent_socket, &surface_socket] {
        if socket.exists() {
            let _ = std::fs::remove_file(socket);
        }
    }

    result
}

/// Print the session summary after the gateway stops.
fn print_session_summary(session_id: &str) -> Result<()> {
    let reader = crate::audit::AuditReader::new()?;
    let records = reader.read_session(session_id).unwrap_or_default();

    if records.is_empty() {
        println!("\n  {} No decisions were logged this session.", "ℹ".blue());
        return Ok(());
    }

    let summary = crate::audit::AuditReader::summarize(&records);

    println!();
    println!("  {} Session complete", "─".repeat(40).dimmed());
    println!();
    println!(
        "  {} {} | {} {} | {} {}",
        summary.total_decisions.to_string().bold(),
        "decisions",
        summary.approved.to_string().green().bold(),
        "approved",
        summary.rejected.to_string().red().bold(),
        "rejected",
    );
    println!();
    println!(
        "  View full log: {}",
        format!("diffgate log --session {}", session_id).dimmed()
    );
    println!();

    Ok(())
}
