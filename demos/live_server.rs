//! Live module synchronization server over stdio
//!
//! Run with: cargo run --example live_server
//!
//! The control channel is this process's stdin/stdout, so a build
//! process runs it as a child and pipes messages in:
//!
//!   cargo run --example fake_build | cargo run --example live_server
//!
//! Point a client at the configured port (the fake build uses
//! localhost:3123) and send a sync line to watch reconciliation:
//!
//!   printf '{"type":"sync","modules":{}}\n' | nc localhost 3123
//!
//! The server exits 0 when the build process closes the pipe.

use std::sync::Arc;

use modsync::{ControlChannel, ModuleStore, ServerLifecycle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("modsync=debug".parse()?),
        )
        .init();

    let store = Arc::new(ModuleStore::new());
    let server = Arc::new(ServerLifecycle::new(Arc::clone(&store)));

    let channel = ControlChannel::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        Arc::clone(&store),
        server,
    );

    channel.run().await?;

    eprintln!(
        "Build pipe closed; exiting with {} modules in the table",
        store.module_count().await
    );
    Ok(())
}
