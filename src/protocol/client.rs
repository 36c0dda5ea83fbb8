//! Client-facing message types
//!
//! Spoken over each persistent client connection, one JSON object per
//! line. A client opens with `sync`, carrying its believed module table
//! as a name-to-hash map; the server always answers `syncConfirm` and,
//! when the reconciliation is non-empty, follows with `newModules`. The
//! same `newModules` shape is reused verbatim for commit broadcasts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::encode_line;
use crate::error::Result;
use crate::sync::SyncResult;
use crate::table::ModuleRecord;

/// Message from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// The client's believed module table, sent once after connecting
    Sync { modules: HashMap<String, ModuleHash> },

    /// Anything with an unrecognized `type` tag; logged and skipped
    #[serde(other)]
    Unknown,
}

/// A client's record of one module: hash only, payloads never travel back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHash {
    pub hash: String,
}

impl ModuleHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

/// Message to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Always sent in direct response to `sync`
    SyncConfirm,

    /// Module delta: the initial-sync correction, or a commit broadcast
    NewModules {
        new_module_data: HashMap<String, ModuleRecord>,
        removed_modules: Vec<String>,
    },
}

impl ServerMessage {
    /// Serialize as one newline-terminated frame
    pub fn encode(&self) -> Result<bytes::Bytes> {
        encode_line(self)
    }
}

impl From<SyncResult> for ServerMessage {
    fn from(result: SyncResult) -> Self {
        ServerMessage::NewModules {
            new_module_data: result.new_module_data,
            removed_modules: result.removed_modules,
        }
    }
}
