//! Session management core module.
//!
//! Holds the per-endpoint SSH session records and the shared store that the
//! log tailer, the traffic sniffer and the stats flusher mutate concurrently.

/// Session records, keys and snapshots.
pub mod session;
/// The mutex-guarded session table.
pub mod session_store;

pub use session::{Direction, Session, SessionKey, SessionSnapshot};
pub use session_store::SessionStore;
