//! Diffgate — diff-based human approval gateway
//!
//! Puts a human between an AI coding agent and your files.
//!
//! Quick start:
//!   diffgate serve            # run the gateway for the current workspace
//!   diffgate log              # see what was approved and rejected
//!
//! For more info: diffgate --help

// Suppress warnings for items that are public API (used by tests)
#![allow(dead_code, unused_imports)]

mod agent;
mod approval;
mod audit;
mod cli;
mod diff;
mod surface;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

/// Diffgate — every file mutation an agent proposes gets a human decision.
///
/// Agents propose writes and edits over a socket; reviewers see a
/// structured diff and approve it fully, hunk by hunk, or not at all.
#[derive(Parser)]
#[command(
    name = "diffgate",
    version,
    about = "Review every file mutation your AI agent proposes",
    long_about = "Diffgate sits between an AI coding agent and your files.\n\
                  Every proposed write or edit becomes a diff a human reviews\n\
                  before anything touches the workspace.\n\n\
                  Quick start:\n  \
                  diffgate serve      # run the gateway for the current workspace\n  \
                  diffgate log        # see what was approved and rejected"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the approval gateway (the main command)
    Serve {
        /// Workspace directory to diff against
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Agent-facing socket path
        #[arg(long)]
        agent_socket: Option<PathBuf>,

        /// Surface-facing socket path
        #[arg(long)]
        surface_socket: Option<PathBuf>,

        /// Fallback when a diff can't be computed: terminal, approve, deny
        #[arg(long, default_value = "terminal")]
        fallback: String,

        /// Apply approved content to the workspace on the host side
        #[arg(long)]
        apply: bool,

        /// Session ID override
        #[arg(long)]
        session: Option<String>,

        /// Disable the audit log
        #[arg(long)]
        no_audit: bool,
    },

    /// See what was decided
    Log {
        /// Show a specific session
        #[arg(short, long, help = "Session ID to view")]
        session: Option<String>,

        /// Filter by mutation kind
        #[arg(short, long, help = "Filter: write, edit")]
        kind: Option<String>,

        /// Filter by decision
        #[arg(short, long, help = "Filter: approved, rejected, fallback")]
        decision: Option<String>,

        /// Limit number of records shown
        #[arg(short, long, help = "Max records to show")]
        limit: Option<usize>,

        /// Show only the summary
        #[arg(long, help = "Show only the session summary")]
        summary: bool,

        /// List all available sessions
        #[arg(long, help = "List all recorded sessions")]
        list: bool,
    },
}

#[tokio::main]
async fn main() {
    // Set up tracing (only show at RUST_LOG=debug level to keep output clean)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("diffgate=warn".parse().unwrap()),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        None => show_status(),

        Some(Commands::Serve {
            workspace,
            agent_socket,
            surface_socket,
            fallback,
            apply,
            session,
            no_audit,
        }) => {
            let options = cli::serve::ServeOptions {
                workspace,
                agent_socket,
                surface_socket,
                fallback_mode: fallback,
                apply,
                session_id: session,
                no_audit,
            };
            cli::serve::run_serve(options).await
        }

        Some(Commands::Log {
            session,
            kind,
            decision,
            limit,
            summary,
            list,
        }) => {
            if list {
                cli::log::run_log_list()
            } else {
                cli::log::run_log(
                    session.as_deref(),
                    kind.as_deref(),
                    decision.as_deref(),
                    limit,
                    summary,
                )
            }
        }
    };

    if let Err(e) = result {
        eprintln!();
        eprintln!("  {} {}", "✗".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        eprintln!();
        std::process::exit(1);
    }
}

/// When user just types `diffgate` with no arguments: show recent
/// activity and the commands that matter.
fn show_status() -> anyhow::Result<()> {
    println!();
    println!(
        "  {}  {}",
        "diffgate".bold(),
        "— human approval for agent file mutations".dimmed()
    );
    println!();

    if let Ok(reader) = audit::AuditReader::new() {
        if let Ok(records) = reader.read_latest_session() {
            if !records.is_empty() {
                let summary = audit::AuditReader::summarize(&records);
                println!(
                    "  Last session: {} ({})",
                    summary.session_id.cyan(),
                    summary.one_line()
                );
                println!();
            }
        }
    }

    println!("  {}", "Commands:".dimmed());
    println!(
        "    {}      run the gateway for the current workspace",
        "diffgate serve".bold()
    );
    println!(
        "    {}        see what was approved and rejected",
        "diffgate log".bold()
    );
    println!();

    Ok(())
}
