//! Wire protocol vocabularies
//!
//! Both channels speak newline-delimited JSON with a `type` discriminator:
//!
//! - [`control`]: the private channel to the build process (module batches
//!   in, commit acknowledgements out)
//! - [`client`]: the client-facing channel (sync requests in, sync
//!   confirmations and module deltas out)

pub mod client;
pub mod control;

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;

/// Serialize a message as one newline-terminated JSON frame.
///
/// The returned `Bytes` is cheap to clone, so a broadcast serializes once
/// and fans the same frame out to every connection.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<Bytes> {
    let mut line = serde_json::to_vec(msg)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}
