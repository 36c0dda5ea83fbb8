//! Control channel message loop
//!
//! One loop, strictly in arrival order: `newModule` lines stage records
//! into the pending batch, `removedModules` commits the batch, and any
//! line that fails to parse is logged and skipped without disturbing
//! the stream. End-of-stream means the build process exited and is the
//! normal shutdown path.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::error::Result;
use crate::protocol::control::{ControlMessage, ControlReply};
use crate::server::{BroadcastEngine, ListenConfig, ServerLifecycle};
use crate::table::{ModuleRecord, ModuleStore, PendingBatch};

/// Consumes the build process's message stream and drives commits
pub struct ControlChannel<R, W> {
    lines: Lines<BufReader<R>>,
    upstream: W,
    pending: PendingBatch,
    store: Arc<ModuleStore>,
    server: Arc<ServerLifecycle>,
    broadcaster: BroadcastEngine,
}

impl<R, W> ControlChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a channel over the given upstream read/write pair.
    ///
    /// In production the pair is the build process's pipe; tests drive
    /// it with in-memory duplex streams.
    pub fn new(
        reader: R,
        writer: W,
        store: Arc<ModuleStore>,
        server: Arc<ServerLifecycle>,
    ) -> Self {
        let broadcaster = BroadcastEngine::new(Arc::clone(server.clients()));
        Self {
            lines: BufReader::new(reader).lines(),
            upstream: writer,
            pending: PendingBatch::new(),
            store,
            server,
            broadcaster,
        }
    }

    /// Process messages until the upstream closes.
    ///
    /// Returns `Ok(())` on end-of-stream: the build process exiting is
    /// a clean shutdown, not an error.
    pub async fn run(mut self) -> Result<()> {
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ControlMessage>(&line) {
                Ok(msg) => self.dispatch(msg).await?,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed control line");
                }
            }
        }

        tracing::info!("Build process closed the control channel, shutting down");
        Ok(())
    }

    async fn dispatch(&mut self, msg: ControlMessage) -> Result<()> {
        match msg {
            ControlMessage::Config {
                hostname,
                port,
                tlsoptions,
            } => {
                tracing::debug!(host = %hostname, port, "Listen config received");
                self.server
                    .set_config(ListenConfig::new(hostname, port, tlsoptions))
                    .await;
            }
            ControlMessage::NewModule { name, data } => {
                tracing::debug!(module = %name, hash = %data.hash, "Module staged");
                self.pending
                    .insert(ModuleRecord::new(name, data.hash, data.payload));
            }
            ControlMessage::RemovedModules { removed_modules } => {
                self.commit(removed_modules).await?;
            }
            ControlMessage::Unknown => {
                tracing::warn!("Unrecognized control message type");
            }
        }
        Ok(())
    }

    /// Commit the pending batch.
    ///
    /// The acknowledgement goes out before the merge so the build
    /// process can start assembling its next batch while this one is
    /// still being applied and broadcast.
    async fn commit(&mut self, removed: Vec<String>) -> Result<()> {
        self.upstream
            .write_all(&ControlReply::ConfirmNewModuleData.encode()?)
            .await?;
        self.upstream.flush().await?;

        let batch = self.pending.take();
        self.store.commit(&batch, &removed).await;

        let _ = self.server.ensure_started().await;

        if !batch.is_empty() || !removed.is_empty() {
            self.broadcaster.broadcast(batch, removed).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    use crate::protocol::client::{ClientMessage, ModuleHash, ServerMessage};
    use crate::protocol::encode_line;

    use tokio_test::assert_ok;

    use super::*;

    /// Wire a control channel to an in-memory build process.
    ///
    /// Returns the channel plus the build side's write and read handles.
    fn control_fixture() -> (
        ControlChannel<tokio::io::DuplexStream, tokio::io::DuplexStream>,
        tokio::io::DuplexStream,
        BufReader<tokio::io::DuplexStream>,
        Arc<ModuleStore>,
        Arc<ServerLifecycle>,
    ) {
        let (build_tx, channel_rx) = tokio::io::duplex(4096);
        let (channel_tx, build_rx) = tokio::io::duplex(4096);

        let store = Arc::new(ModuleStore::new());
        let server = Arc::new(ServerLifecycle::new(Arc::clone(&store)));
        let channel = ControlChannel::new(
            channel_rx,
            channel_tx,
            Arc::clone(&store),
            Arc::clone(&server),
        );

        (channel, build_tx, BufReader::new(build_rx), store, server)
    }

    async fn send_lines(tx: &mut tokio::io::DuplexStream, lines: &[&str]) {
        for line in lines {
            tx.write_all(line.as_bytes()).await.unwrap();
            tx.write_all(b"\n").await.unwrap();
        }
    }

    async fn read_reply(rx: &mut BufReader<tokio::io::DuplexStream>) -> ControlReply {
        let mut line = String::new();
        rx.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_commit_applies_batch_and_acks() {
        let (channel, mut build_tx, mut build_rx, store, _server) = control_fixture();

        send_lines(
            &mut build_tx,
            &[
                r#"{"type":"newModule","name":"a","data":{"hash":"hX","payload":"aa"}}"#,
                r#"{"type":"newModule","name":"b","data":{"hash":"hY","payload":"bb"}}"#,
                r#"{"type":"removedModules","removedModules":["c"]}"#,
            ],
        )
        .await;
        drop(build_tx);

        tokio_test::assert_ok!(channel.run().await);

        assert!(matches!(
            read_reply(&mut build_rx).await,
            ControlReply::ConfirmNewModuleData
        ));
        assert_eq!(store.module_count().await, 2);
    }

    #[tokio::test]
    async fn test_one_ack_per_commit_even_when_batch_is_empty() {
        let (channel, mut build_tx, mut build_rx, store, _server) = control_fixture();

        send_lines(
            &mut build_tx,
            &[
                r#"{"type":"removedModules","removedModules":[]}"#,
                r#"{"type":"newModule","name":"a","data":{"hash":"h1","payload":""}}"#,
                r#"{"type":"removedModules","removedModules":[]}"#,
            ],
        )
        .await;
        drop(build_tx);

        tokio_test::assert_ok!(channel.run().await);

        for _ in 0..2 {
            assert!(matches!(
                read_reply(&mut build_rx).await,
                ControlReply::ConfirmNewModuleData
            ));
        }
        assert_eq!(store.module_count().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_lines_are_skipped() {
        let (channel, mut build_tx, _build_rx, store, _server) = control_fixture();

        send_lines(
            &mut build_tx,
            &[
                "this is not json",
                r#"{"type":"heartbeat"}"#,
                r#"{"type":"newModule","name":"a","data":{"hash":"h1","payload":"ok"}}"#,
                r#"{"type":"removedModules","removedModules":[]}"#,
            ],
        )
        .await;
        drop(build_tx);

        tokio_test::assert_ok!(channel.run().await);
        assert_eq!(store.module_count().await, 1);
    }

    #[tokio::test]
    async fn test_upstream_eof_is_clean_shutdown() {
        let (channel, build_tx, _build_rx, _store, _server) = control_fixture();
        drop(build_tx);

        tokio_test::assert_ok!(channel.run().await);
    }

    async fn client_sync(
        addr: std::net::SocketAddr,
        view: HashMap<String, ModuleHash>,
    ) -> (
        tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
        tokio::net::tcp::OwnedWriteHalf,
    ) {
        let socket = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = socket.into_split();
        let mut lines = BufReader::new(read_half).lines();

        // A junk line first; the connection must survive it.
        write_half.write_all(b"junk line\n").await.unwrap();
        write_half
            .write_all(&encode_line(&ClientMessage::Sync { modules: view }).unwrap())
            .await
            .unwrap();

        let confirm = lines.next_line().await.unwrap().unwrap();
        let confirm: ServerMessage = serde_json::from_str(&confirm).unwrap();
        assert!(matches!(confirm, ServerMessage::SyncConfirm));

        (lines, write_half)
    }

    #[tokio::test]
    async fn test_end_to_end_sync() {
        let (channel, mut build_tx, mut build_rx, _store, server) = control_fixture();

        send_lines(
            &mut build_tx,
            &[
                r#"{"type":"config","hostname":"127.0.0.1","port":0}"#,
                r#"{"type":"newModule","name":"x","data":{"hash":"h1","payload":"foo"}}"#,
                r#"{"type":"removedModules","removedModules":[]}"#,
            ],
        )
        .await;
        drop(build_tx);

        // Run to completion: commit done, listener up.
        tokio_test::assert_ok!(channel.run().await);
        assert!(matches!(
            read_reply(&mut build_rx).await,
            ControlReply::ConfirmNewModuleData
        ));
        let addr = server.ensure_started().await.unwrap();

        // A fresh client receives the whole table after syncConfirm.
        let (mut lines, _w1) = client_sync(addr, HashMap::new()).await;
        let delta = lines.next_line().await.unwrap().unwrap();
        match serde_json::from_str::<ServerMessage>(&delta).unwrap() {
            ServerMessage::NewModules {
                new_module_data,
                removed_modules,
            } => {
                assert_eq!(new_module_data.len(), 1);
                assert_eq!(new_module_data["x"].hash, "h1");
                assert_eq!(new_module_data["x"].payload, "foo");
                assert!(removed_modules.is_empty());
            }
            other => panic!("Expected NewModules, got {:?}", other),
        }

        // A current client gets syncConfirm and nothing else.
        let mut view = HashMap::new();
        view.insert("x".to_string(), ModuleHash::new("h1"));
        let (mut lines, _w2) = client_sync(addr, view).await;

        let quiet =
            tokio::time::timeout(std::time::Duration::from_millis(100), lines.next_line()).await;
        assert!(quiet.is_err(), "current client received an unexpected message");
    }

    #[tokio::test]
    async fn test_commit_broadcasts_to_synced_clients() {
        let (channel, mut build_tx, mut build_rx, _store, server) = control_fixture();

        send_lines(
            &mut build_tx,
            &[
                r#"{"type":"config","hostname":"127.0.0.1","port":0}"#,
                r#"{"type":"newModule","name":"x","data":{"hash":"h1","payload":"foo"}}"#,
                r#"{"type":"removedModules","removedModules":[]}"#,
            ],
        )
        .await;

        let handle = tokio::spawn(channel.run());
        assert!(matches!(
            read_reply(&mut build_rx).await,
            ControlReply::ConfirmNewModuleData
        ));
        // Config precedes the commit we just saw acked, so this either
        // returns the already-bound endpoint or binds it first.
        let addr = server.ensure_started().await.unwrap();

        let mut view = HashMap::new();
        view.insert("x".to_string(), ModuleHash::new("h1"));
        let (mut lines_a, _wa) = client_sync(addr, view.clone()).await;
        let (mut lines_b, _wb) = client_sync(addr, view).await;

        // Next batch: x changes, y is gone.
        send_lines(
            &mut build_tx,
            &[
                r#"{"type":"newModule","name":"x","data":{"hash":"h2","payload":"bar"}}"#,
                r#"{"type":"removedModules","removedModules":["y"]}"#,
            ],
        )
        .await;
        drop(build_tx);
        tokio_test::assert_ok!(handle.await.unwrap());

        for lines in [&mut lines_a, &mut lines_b] {
            let delta = lines.next_line().await.unwrap().unwrap();
            match serde_json::from_str::<ServerMessage>(&delta).unwrap() {
                ServerMessage::NewModules {
                    new_module_data,
                    removed_modules,
                } => {
                    assert_eq!(new_module_data["x"].hash, "h2");
                    assert_eq!(removed_modules, vec!["y".to_string()]);
                }
                other => panic!("Expected NewModules, got {:?}", other),
            }
        }
    }
}
