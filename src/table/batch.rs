//! Pending batch accumulator

use std::collections::HashMap;

use super::record::ModuleRecord;

/// Records reported by the build process since the last commit.
///
/// The build may report the same name several times within a batch;
/// the last write wins. A commit drains the whole batch in one step so
/// the merged snapshot and the broadcast payload are the same set.
#[derive(Debug, Default)]
pub struct PendingBatch {
    modules: HashMap<String, ModuleRecord>,
}

impl PendingBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record, keyed by its name
    pub fn insert(&mut self, record: ModuleRecord) {
        self.modules.insert(record.name.clone(), record);
    }

    /// Drain the batch, leaving it empty
    pub fn take(&mut self) -> HashMap<String, ModuleRecord> {
        std::mem::take(&mut self.modules)
    }

    /// Number of distinct modules in the batch
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
