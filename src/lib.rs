//! # modsync
//!
//! Live-development module synchronization server. Sits between a build
//! pipeline and any number of browser-like clients: the build process
//! reports content-hashed module updates over a private line-oriented
//! channel, each batch is committed atomically into an in-memory module
//! table, and every committed delta is pushed to all connected clients.
//! A newly connecting (or reconnecting) client sends its believed
//! name-to-hash table once and receives the minimal correction; after
//! that, broadcasts keep it current.
//!
//! Nothing is compiled or rendered here, and nothing is persisted: the
//! table lives in process memory and every client resynchronizes from
//! scratch after a restart.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use modsync::{ControlChannel, ModuleStore, ServerLifecycle};
//!
//! #[tokio::main]
//! async fn main() -> modsync::Result<()> {
//!     let store = Arc::new(ModuleStore::new());
//!     let server = Arc::new(ServerLifecycle::new(Arc::clone(&store)));
//!
//!     // The build process speaks newline-delimited JSON on our stdio.
//!     let channel = ControlChannel::new(tokio::io::stdin(), tokio::io::stdout(), store, server);
//!
//!     // Runs until the build process closes its side; that is the
//!     // normal shutdown path.
//!     channel.run().await
//! }
//! ```
//!
//! # Protocol summary
//!
//! Control channel (build process, one JSON object per line):
//! `config`, `newModule`, `removedModules` in; `confirmNewModuleData`
//! out, once per commit. Client channel (per TCP connection, same
//! framing): `sync` in; `syncConfirm` and `newModules` out.

pub mod control;
pub mod error;
pub mod protocol;
pub mod server;
pub mod sync;
pub mod table;

pub use control::ControlChannel;
pub use error::{Error, Result};
pub use server::{BroadcastEngine, ClientRegistry, ListenConfig, ServerLifecycle};
pub use sync::{reconcile, SyncResult};
pub use table::{ModuleRecord, ModuleStore, ModuleTable, PendingBatch};
