//! Build-process control channel
//!
//! The single writer of the module table. Consumes the build process's
//! line stream, stages module updates, and turns each commit marker
//! into an atomic table merge plus a broadcast.

mod channel;

pub use channel::ControlChannel;
