//! Auth log classification.
//!
//! Turns one sshd line into zero or one [`AuthLine`], stamped with the time
//! read from the line prefix. Stateless; the log tailer applies the results to
//! the session store.

pub mod classifier;
pub mod timestamp;

pub use classifier::{AuthLine, ClassifiedLine, EventClassifier};
pub use timestamp::TimestampParser;
