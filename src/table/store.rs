//! Module table and its shared store
//!
//! `ModuleTable` is the pure mapping; `ModuleStore` wraps it in a
//! `RwLock` so the single writer (the control channel) and any number of
//! reconciling client connections are serialized. A commit holds the
//! write lock for the whole merge, so no reader ever observes a
//! partially applied batch.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::protocol::client::ModuleHash;
use crate::sync::{self, SyncResult};

use super::record::ModuleRecord;

/// Authoritative mapping of module name to latest committed record
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: HashMap<String, ModuleRecord>,
}

impl ModuleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record, keyed by its name
    pub fn insert(&mut self, record: ModuleRecord) {
        self.modules.insert(record.name.clone(), record);
    }

    /// Remove a record by name
    pub fn remove(&mut self, name: &str) -> Option<ModuleRecord> {
        self.modules.remove(name)
    }

    /// Look up a record by name
    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.get(name)
    }

    /// Whether a name is present
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Number of committed modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate over all committed records
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModuleRecord)> {
        self.modules.iter()
    }

    /// Merge a committed batch: overwrite by name, then delete removals.
    ///
    /// Removals win over same-batch inserts, matching the order the
    /// build process reports them in.
    pub fn apply(&mut self, batch: &HashMap<String, ModuleRecord>, removed: &[String]) {
        for record in batch.values() {
            self.insert(record.clone());
        }
        for name in removed {
            self.remove(name);
        }
    }
}

/// Shared handle to the module table.
///
/// Thread-safe via `RwLock`: reconciliations are read-heavy and run
/// concurrently, while commits take the single write section.
#[derive(Debug, Default)]
pub struct ModuleStore {
    table: RwLock<ModuleTable>,
}

impl ModuleStore {
    /// Create a store with an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically merge a committed batch into the table
    pub async fn commit(&self, batch: &HashMap<String, ModuleRecord>, removed: &[String]) {
        let mut table = self.table.write().await;
        table.apply(batch, removed);

        tracing::info!(
            updated = batch.len(),
            removed = removed.len(),
            total = table.len(),
            "Batch committed"
        );
    }

    /// Diff a client's view against one consistent table snapshot
    pub async fn reconcile(&self, view: &HashMap<String, ModuleHash>) -> SyncResult {
        let table = self.table.read().await;
        sync::reconcile(view, &table)
    }

    /// Number of committed modules
    pub async fn module_count(&self) -> usize {
        self.table.read().await.len()
    }
}
