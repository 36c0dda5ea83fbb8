//! Control channel message types
//!
//! Messages arriving from the build process, one JSON object per line.
//! The build process reports module updates incrementally (`newModule`)
//! and ends each batch with a `removedModules` commit marker; the service
//! answers every commit marker with a single `confirmNewModuleData` reply
//! before merging, so the build can pipeline its next batch.

use serde::{Deserialize, Serialize};

use super::encode_line;
use crate::error::Result;

/// Message from the build process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlMessage {
    /// Listen parameters for the client-facing endpoint.
    ///
    /// Meaningful before the first commit; once the listener is bound,
    /// later occurrences are stored but inert.
    Config {
        hostname: String,
        port: u16,
        /// Opaque TLS material; termination happens in front of the
        /// service, so this is carried through and never interpreted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tlsoptions: Option<serde_json::Value>,
    },

    /// A module changed or appeared in the batch under construction
    NewModule { name: String, data: ModuleData },

    /// Commit marker: the batch is complete and these names are gone
    RemovedModules { removed_modules: Vec<String> },

    /// Anything with an unrecognized `type` tag; logged and skipped
    #[serde(other)]
    Unknown,
}

/// Module content as reported by the build process.
///
/// Extra fields in `data` are tolerated and ignored; only the hash and
/// payload matter here. The hash is the sole change-detection key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleData {
    pub hash: String,
    pub payload: String,
}

/// Reply to the build process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlReply {
    /// Sent exactly once per `removedModules`, before the merge
    ConfirmNewModuleData,
}

impl ControlReply {
    /// Serialize as one newline-terminated frame
    pub fn encode(&self) -> Result<bytes::Bytes> {
        encode_line(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let msg: ControlMessage =
            serde_json::from_str(r#"{"type":"config","hostname":"localhost","port":4000}"#)
                .unwrap();
        match msg {
            ControlMessage::Config {
                hostname,
                port,
                tlsoptions,
            } => {
                assert_eq!(hostname, "localhost");
                assert_eq!(port, 4000);
                assert!(tlsoptions.is_none());
            }
            other => panic!("Expected Config, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_with_tls_material() {
        let msg: ControlMessage = serde_json::from_str(
            r#"{"type":"config","hostname":"0.0.0.0","port":443,"tlsoptions":{"cert":"..."}}"#,
        )
        .unwrap();
        match msg {
            ControlMessage::Config { tlsoptions, .. } => assert!(tlsoptions.is_some()),
            other => panic!("Expected Config, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_new_module() {
        let msg: ControlMessage = serde_json::from_str(
            r#"{"type":"newModule","name":"x","data":{"hash":"h1","payload":"foo"}}"#,
        )
        .unwrap();
        match msg {
            ControlMessage::NewModule { name, data } => {
                assert_eq!(name, "x");
                assert_eq!(data.hash, "h1");
                assert_eq!(data.payload, "foo");
            }
            other => panic!("Expected NewModule, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_new_module_ignores_extra_data_fields() {
        let msg: ControlMessage = serde_json::from_str(
            r#"{"type":"newModule","name":"x","data":{"hash":"h1","payload":"foo","sourcemap":"m"}}"#,
        )
        .unwrap();
        assert!(matches!(msg, ControlMessage::NewModule { .. }));
    }

    #[test]
    fn test_parse_removed_modules() {
        let msg: ControlMessage =
            serde_json::from_str(r#"{"type":"removedModules","removedModules":["a","b"]}"#)
                .unwrap();
        match msg {
            ControlMessage::RemovedModules { removed_modules } => {
                assert_eq!(removed_modules, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("Expected RemovedModules, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_type_falls_through() {
        let msg: ControlMessage =
            serde_json::from_str(r#"{"type":"heartbeat","ts":12345}"#).unwrap();
        assert!(matches!(msg, ControlMessage::Unknown));
    }

    #[test]
    fn test_confirm_reply_wire_shape() {
        let frame = ControlReply::ConfirmNewModuleData.encode().unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        assert_eq!(text, "{\"type\":\"confirmNewModuleData\"}\n");
    }
}
