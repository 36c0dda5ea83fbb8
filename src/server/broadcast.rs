//! Commit broadcast fan-out
//!
//! On every commit the freshly merged delta goes out verbatim to every
//! live connection. There is no per-connection diffing here: a synced
//! connection already matches the table as of its last update, so the
//! raw batch is the correct correction for all of them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::client::ServerMessage;
use crate::table::ModuleRecord;

use super::clients::ClientRegistry;

/// Pushes committed deltas to all live client connections
#[derive(Debug, Clone)]
pub struct BroadcastEngine {
    clients: Arc<ClientRegistry>,
}

impl BroadcastEngine {
    /// Create an engine over the given connection registry
    pub fn new(clients: Arc<ClientRegistry>) -> Self {
        Self { clients }
    }

    /// Deliver one batch delta to every live connection.
    ///
    /// Fire-and-forget: delivery failures are pruned and logged, never
    /// surfaced to the control channel.
    pub async fn broadcast(
        &self,
        new_module_data: HashMap<String, ModuleRecord>,
        removed_modules: Vec<String>,
    ) {
        let updated = new_module_data.len();
        let removed = removed_modules.len();

        let msg = ServerMessage::NewModules {
            new_module_data,
            removed_modules,
        };
        let frame = match msg.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode broadcast frame");
                return;
            }
        };

        let clients = self.clients.fan_out(frame).await;
        tracing::debug!(updated, removed, clients, "Batch broadcast");
    }
}
