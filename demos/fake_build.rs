//! Scripted stand-in for a build process
//!
//! Run with: cargo run --example fake_build
//!
//! Emits a plausible control-message sequence on stdout: listen config,
//! an initial batch of modules, then an incremental batch that changes
//! one module and removes another. Pipe it into the server:
//!
//!   cargo run --example fake_build | cargo run --example live_server
//!
//! It does not read acknowledgements back; it just paces itself with
//! short sleeps the way a watch-mode bundler would.

use std::time::Duration;

use modsync::protocol::control::{ControlMessage, ModuleData};
use modsync::protocol::encode_line;
use tokio::io::AsyncWriteExt;

fn module(name: &str, hash: &str, payload: &str) -> ControlMessage {
    ControlMessage::NewModule {
        name: name.to_string(),
        data: ModuleData {
            hash: hash.to_string(),
            payload: payload.to_string(),
        },
    }
}

fn commit(removed: &[&str]) -> ControlMessage {
    ControlMessage::RemovedModules {
        removed_modules: removed.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut out = tokio::io::stdout();

    let initial = vec![
        ControlMessage::Config {
            hostname: "localhost".to_string(),
            port: 3123,
            tlsoptions: None,
        },
        module("src/app.js", "3c92a1", "console.log('app v1')"),
        module("src/util.js", "9f01bb", "export const n = 1"),
        commit(&[]),
    ];
    let incremental = vec![
        module("src/app.js", "77d4e0", "console.log('app v2')"),
        commit(&["src/util.js"]),
    ];

    for batch in [initial, incremental] {
        for msg in &batch {
            out.write_all(&encode_line(msg)?).await?;
        }
        out.flush().await?;
        tokio::time::sleep(Duration::from_millis(1500)).await;
    }

    Ok(())
}
