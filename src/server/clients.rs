//! Live client connection registry
//!
//! Connections register on accept and are removed on disconnect, error,
//! or the first failed delivery to their outbound queue. Fan-out clones
//! one serialized frame per connection, so a commit costs one encode
//! regardless of how many clients are watching.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

/// Handle to one live connection's outbound queue
#[derive(Debug)]
struct ClientHandle {
    tx: mpsc::UnboundedSender<Bytes>,
}

/// Registry of all live client connections
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<u64, ClientHandle>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and hand back its outbound queue receiver
    pub async fn register(&self, id: u64) -> mpsc::UnboundedReceiver<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut clients = self.clients.write().await;
        clients.insert(id, ClientHandle { tx });

        tracing::debug!(client_id = id, clients = clients.len(), "Client registered");
        rx
    }

    /// Remove a connection; returns whether it was still registered
    pub async fn deregister(&self, id: u64) -> bool {
        let mut clients = self.clients.write().await;
        let removed = clients.remove(&id).is_some();

        if removed {
            tracing::debug!(client_id = id, clients = clients.len(), "Client deregistered");
        }
        removed
    }

    /// Number of live connections
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Queue a frame on every live connection's outbound channel.
    ///
    /// Delivery is fire-and-forget: a connection whose queue is gone
    /// (it disconnected moments earlier) is pruned and the rest still
    /// receive the frame. Returns the number of deliveries.
    pub(crate) async fn fan_out(&self, frame: Bytes) -> usize {
        let mut clients = self.clients.write().await;

        clients.retain(|id, handle| {
            if handle.tx.send(frame.clone()).is_ok() {
                true
            } else {
                tracing::debug!(client_id = *id, "Pruning disconnected client from fan-out");
                false
            }
        });

        clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_deregister() {
        let registry = ClientRegistry::new();

        let _rx = registry.register(1).await;
        assert_eq!(registry.client_count().await, 1);

        assert!(registry.deregister(1).await);
        assert!(!registry.deregister(1).await);
        assert_eq!(registry.client_count().await, 0);
    }

    #[tokio::test]
    async fn test_fan_out_prunes_dead_queues() {
        let registry = ClientRegistry::new();

        let mut rx1 = registry.register(1).await;
        let rx2 = registry.register(2).await;
        drop(rx2);

        let delivered = registry.fan_out(Bytes::from_static(b"frame\n")).await;

        assert_eq!(delivered, 1);
        assert_eq!(registry.client_count().await, 1);
        assert_eq!(rx1.recv().await.unwrap(), Bytes::from_static(b"frame\n"));
    }
}
