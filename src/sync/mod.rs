//! Client view reconciliation
//!
//! Computes the minimal correction that brings a client's believed
//! module table in line with the authoritative one: records the client
//! is missing or holds a stale hash for, plus names it still carries
//! that no longer exist. Pure; callers are responsible for handing it a
//! consistent table snapshot.

use std::collections::HashMap;

use crate::protocol::client::ModuleHash;
use crate::table::{ModuleRecord, ModuleTable};

/// The correction a client must apply after a sync
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResult {
    /// Records absent from the client's view or differing by hash
    pub new_module_data: HashMap<String, ModuleRecord>,
    /// Names the client holds that are gone from the table
    pub removed_modules: Vec<String>,
}

impl SyncResult {
    /// Whether the client is already current
    pub fn is_empty(&self) -> bool {
        self.new_module_data.is_empty() && self.removed_modules.is_empty()
    }
}

/// Diff a client's name-to-hash view against the table.
///
/// Hash equality is the only comparison; payloads never enter into it.
pub fn reconcile(view: &HashMap<String, ModuleHash>, table: &ModuleTable) -> SyncResult {
    let mut result = SyncResult::default();

    for (name, record) in table.iter() {
        let current = view.get(name).is_some_and(|m| m.hash == record.hash);
        if !current {
            result
                .new_module_data
                .insert(name.clone(), record.clone());
        }
    }

    for name in view.keys() {
        if !table.contains(name) {
            result.removed_modules.push(name.clone());
        }
    }

    result
}
