//! The authoritative module table
//!
//! [`ModuleTable`] maps module names to their latest committed record and
//! is the single source of truth clients reconcile against. Records for a
//! batch under construction accumulate in a [`PendingBatch`] until the
//! build process sends its commit marker; [`ModuleStore`] wraps the table
//! for shared access so a commit is never observed half-applied.

mod batch;
mod record;
mod store;

pub use batch::PendingBatch;
pub use record::ModuleRecord;
pub use store::{ModuleStore, ModuleTable};
