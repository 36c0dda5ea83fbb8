//! Per-connection protocol handler
//!
//! Each accepted client runs its own task: a `select!` loop over inbound
//! lines and the connection's outbound broadcast queue. The connection
//! starts awaiting sync, answers the client's `sync` with a reconciled
//! correction, and from then on just relays broadcast frames until the
//! transport closes.
//!
//! Broadcast frames queued before the client has synced are relayed as
//! well: the delta is self-describing and idempotent to apply, and a
//! client that syncs afterwards converges on the post-commit table
//! either way.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::protocol::client::{ClientMessage, ServerMessage};
use crate::table::ModuleStore;

use super::clients::ClientRegistry;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Transport connected, no `sync` received yet
    AwaitingSync,
    /// Sync exchange complete; broadcasts keep this connection current
    Synced,
}

/// Server side of one client connection
pub struct ClientConnection {
    id: u64,
    peer_addr: SocketAddr,
    phase: ConnectionPhase,
    store: Arc<ModuleStore>,
    clients: Arc<ClientRegistry>,
}

impl ClientConnection {
    /// Create a handler for an accepted, already-registered connection
    pub fn new(
        id: u64,
        peer_addr: SocketAddr,
        store: Arc<ModuleStore>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            phase: ConnectionPhase::AwaitingSync,
            store,
            clients,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Drive the connection until the transport closes.
    ///
    /// Deregisters the connection on every exit path.
    pub async fn run(
        mut self,
        socket: TcpStream,
        mut outbound: mpsc::UnboundedReceiver<Bytes>,
    ) -> Result<()> {
        let (read_half, mut write_half) = socket.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let result = loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Err(e) = self.handle_line(&line, &mut write_half).await {
                            break Err(e);
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e.into()),
                },
                frame = outbound.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = write_half.write_all(&frame).await {
                            break Err(e.into());
                        }
                    }
                    // Registry dropped our queue
                    None => break Ok(()),
                },
            }
        };

        self.clients.deregister(self.id).await;
        tracing::debug!(client_id = self.id, peer = %self.peer_addr, "Client connection closed");
        result
    }

    async fn handle_line(&mut self, line: &str, writer: &mut OwnedWriteHalf) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let msg = match serde_json::from_str::<ClientMessage>(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(
                    client_id = self.id,
                    error = %e,
                    "Skipping malformed client line"
                );
                return Ok(());
            }
        };

        match msg {
            ClientMessage::Sync { modules } => {
                let result = self.store.reconcile(&modules).await;

                writer.write_all(&ServerMessage::SyncConfirm.encode()?).await?;
                let correction = if result.is_empty() {
                    0
                } else {
                    let n = result.new_module_data.len() + result.removed_modules.len();
                    writer
                        .write_all(&ServerMessage::from(result).encode()?)
                        .await?;
                    n
                };

                self.phase = ConnectionPhase::Synced;
                tracing::info!(
                    client_id = self.id,
                    claimed = modules.len(),
                    correction,
                    "Client synced"
                );
            }
            ClientMessage::Unknown => {
                tracing::warn!(client_id = self.id, "Unrecognized client message type");
            }
        }

        Ok(())
    }
}
