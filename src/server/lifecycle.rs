//! Server lifecycle
//!
//! Maintains at most one listening endpoint for the whole process
//! lifetime. The listener comes up lazily on the first commit and every
//! later start request is a no-op returning the running endpoint. Bind
//! failures are logged and left for a later commit to retry; they never
//! interrupt the control channel.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::table::ModuleStore;

use super::clients::ClientRegistry;
use super::config::ListenConfig;
use super::connection::ClientConnection;

#[derive(Debug, Clone, Copy)]
enum ListenerState {
    NotStarted,
    Running(SocketAddr),
}

/// Owns the client listener and the live-connection registry
pub struct ServerLifecycle {
    config: Mutex<ListenConfig>,
    state: Mutex<ListenerState>,
    clients: Arc<ClientRegistry>,
    store: Arc<ModuleStore>,
    next_client_id: AtomicU64,
}

impl ServerLifecycle {
    /// Create a lifecycle serving the given module store
    pub fn new(store: Arc<ModuleStore>) -> Self {
        Self {
            config: Mutex::new(ListenConfig::default()),
            state: Mutex::new(ListenerState::NotStarted),
            clients: Arc::new(ClientRegistry::new()),
            store,
            next_client_id: AtomicU64::new(1),
        }
    }

    /// The live-connection registry
    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    /// Store listen parameters.
    ///
    /// Overwrites any previous config; once the listener is bound the
    /// stored parameters are inert.
    pub async fn set_config(&self, config: ListenConfig) {
        let bound = matches!(*self.state.lock().await, ListenerState::Running(_));
        if bound {
            tracing::debug!(
                host = %config.hostname,
                port = config.port,
                "Listener already bound, storing inert listen config"
            );
        }
        *self.config.lock().await = config;
    }

    /// Bind the listener once; every later call returns the running
    /// endpoint without rebinding.
    ///
    /// Returns `None` when binding fails; the state stays not-started so
    /// the next commit retries.
    pub async fn ensure_started(self: &Arc<Self>) -> Option<SocketAddr> {
        let mut state = self.state.lock().await;
        if let ListenerState::Running(addr) = *state {
            return Some(addr);
        }

        let config = self.config.lock().await.clone();
        if config.tlsoptions.is_some() {
            tracing::warn!(
                "TLS material supplied; termination is delegated, listening on plain TCP"
            );
        }

        let listener = match TcpListener::bind((config.hostname.as_str(), config.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(
                    host = %config.hostname,
                    port = config.port,
                    error = %e,
                    "Failed to bind client listener"
                );
                return None;
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read client listener address");
                return None;
            }
        };

        tracing::info!(addr = %addr, "Client listener started");

        let lifecycle = Arc::clone(self);
        tokio::spawn(async move {
            lifecycle.accept_loop(listener).await;
        });

        *state = ListenerState::Running(addr);
        Some(addr)
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    // Registered before the handler task runs, so a
                    // broadcast racing with a pending sync still reaches
                    // this connection.
                    let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
                    let outbound = self.clients.register(id).await;

                    tracing::debug!(client_id = id, peer = %peer_addr, "Client connected");

                    let conn = ClientConnection::new(
                        id,
                        peer_addr,
                        Arc::clone(&self.store),
                        Arc::clone(&self.clients),
                    );
                    tokio::spawn(async move {
                        if let Err(e) = conn.run(socket, outbound).await {
                            tracing::debug!(client_id = id, error = %e, "Client connection error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept client connection");
                }
            }
        }
    }
}
