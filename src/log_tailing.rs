//! Auth log tailing.
//!
//! - `log_source`: opening the log at its end and reading complete lines.
//! - `backoff`: the idle delay between reads.
//! - `log_tailer`: the read/classify/correlate/emit loop.

pub mod backoff;
pub mod log_source;
pub mod log_tailer;

pub use backoff::IdleBackoff;
pub use log_source::{open_at_end, LineReader, ReadOutcome};
pub use log_tailer::{correlate, LogTailer};
