//! Surface socket bridge — connects a review surface process to the gateway.
//!
//! Listens on a Unix domain socket. One surface connection is served at a
//! time: outbound gateway messages are written as JSON lines, inbound
//! lines are parsed and fed to the gateway. A malformed line is logged
//! and skipped — a broken surface must never take the gateway down. When
//! the surface disconnects, the bridge goes back to accepting, and
//! undelivered messages stay queued in the channel until a surface
//! reattaches (a reconnecting surface announces `ready` to get the full
//! pending set re-sent).

use crate::approval::ApprovalGateway;
use crate::surface::protocol::{GatewayToSurface, SurfaceToGateway};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Mutex};

/// Bridges the gateway's typed duplex channel onto a Unix socket.
pub struct SurfaceServer {
    socket_path: PathBuf,
    gateway: Arc<ApprovalGateway>,
    /// Taken by `run`; present until the server starts.
    outbound: Mutex<Option<mpsc::UnboundedReceiver<GatewayToSurface>>>,
}

impl SurfaceServer {
    pub fn new(
        socket_path: impl AsRef<Path>,
        gateway: Arc<ApprovalGateway>,
        outbound: mpsc::UnboundedReceiver<GatewayToSurface>,
    ) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            gateway,
            outbound: Mutex::new(Some(outbound)),
        }
    }

    /// Accept surface connections until the gateway releases the channel
    /// (disposal) or the listener fails.
    pub async fn run(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind socket: {}", self.socket_path.display()))?;

        let mut outbound = self
            .outbound
            .lock()
            .await
            .take()
            .context("Surface server already running")?;

        tracing::info!("surface bridge listening on {}", self.socket_path.display());

        loop {
            let (stream, _addr) = listener
                .accept()
                .await
                .context("Failed to accept surface connection")?;
            tracing::info!("review surface connected");

            match serve_connection(stream, &self.gateway, &mut outbound).await {
                Ok(true) => tracing::info!("review surface disconnected"),
                Ok(false) => {
                    tracing::info!("gateway released surface channel, bridge shutting down");
                    return Ok(());
                }
                Err(e) => tracing::warn!("surface connection error: {}", e),
            }
        }
    }
}

/// Pump one surface connection. Returns `Ok(true)` when the surface hung
/// up (keep accepting) and `Ok(false)` when the gateway side closed.
async fn serve_connection(
    stream: UnixStream,
    gateway: &Arc<ApprovalGateway>,
    outbound: &mut mpsc::UnboundedReceiver<GatewayToSurface>,
) -> Result<bool> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    return Ok(false);
                };
                let json = serde_json::to_string(&message)?;
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(true);
                };
                match serde_json::from_str::<SurfaceToGateway>(line.trim()) {
                    Ok(message) => gateway.handle_surface_message(message).await,
                    Err(e) => tracing::warn!("invalid surface message, skipping: {}", e),
                }
            }
        }
    }
}
