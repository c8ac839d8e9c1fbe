//! Periodic reporting of per-session SSH traffic.

pub mod byte_format;
pub mod stats_flusher;

pub use byte_format::format_bytes;
pub use stats_flusher::StatsFlusher;
