//! Module record type

use serde::{Deserialize, Serialize};

/// A named, content-addressed build artifact.
///
/// Identity is the name; two records are equivalent iff their hashes
/// match. The payload is opaque here: it is produced by the build
/// process and applied by the client, never inspected in between, and
/// the hash is trusted to change exactly when the payload does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Module name (e.g., "src/app.js")
    pub name: String,
    /// Content hash, the sole change-detection key
    pub hash: String,
    /// Module payload, opaque to the service
    pub payload: String,
}

impl ModuleRecord {
    /// Create a new record
    pub fn new(
        name: impl Into<String>,
        hash: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
            payload: payload.into(),
        }
    }
}

impl std::fmt::Display for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.hash)
    }
}
