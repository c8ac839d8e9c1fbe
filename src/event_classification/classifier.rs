use chrono::{DateTime, TimeZone};
use regex::{Captures, Regex};

use super::timestamp::TimestampParser;
use crate::session_management::SessionKey;

const IPV4: &str = r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})";

/// What an sshd line says about a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthLine {
    /// `Connection from <ip> port <p> on <ip> port <p>`
    Connection { key: SessionKey },
    /// `Failed password|none for [invalid user ]<user> from <ip> port <p>`
    FailedAttempt { key: SessionKey, user: String },
    /// `error: maximum authentication attempts exceeded for <user> ... [preauth]`
    MaxAuthExceeded { key: SessionKey, user: String },
    /// `Connection closed by authenticating user <user> <ip> port <p> [preauth]`
    ClosedAuthenticating { key: SessionKey, user: String },
    /// `Accepted <method> for <user> from <ip> port <p>`
    Accepted { key: SessionKey, user: String },
    /// `Disconnected from user <user> <ip> port <p>`
    Disconnected { key: SessionKey, user: String },
    /// `Connection closed by <ip> port <p>`, no user in the line
    Closed { key: SessionKey },
}

impl AuthLine {
    pub fn key(&self) -> &SessionKey {
        match self {
            AuthLine::Connection { key }
            | AuthLine::FailedAttempt { key, .. }
            | AuthLine::MaxAuthExceeded { key, .. }
            | AuthLine::ClosedAuthenticating { key, .. }
            | AuthLine::Accepted { key, .. }
            | AuthLine::Disconnected { key, .. }
            | AuthLine::Closed { key } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub timestamp_ms: i64,
    pub line: AuthLine,
}

/// Maps raw auth log lines to [`AuthLine`]s.
///
/// Patterns are tried from the most to the least specific and the first match
/// wins: the generic `Connection closed by <ip>` rule must come after the
/// `authenticating user` one. Lines matching nothing, or carrying an address or
/// port that does not parse, are not classified.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    timestamps: TimestampParser,
    connection: Regex,
    failed_attempt: Regex,
    max_auth_exceeded: Regex,
    closed_authenticating: Regex,
    accepted: Regex,
    disconnected: Regex,
    closed: Regex,
}

impl EventClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            timestamps: TimestampParser::new()?,
            connection: Regex::new(&format!(
                r"Connection from {IPV4} port (\d+) on {IPV4} port (\d+)"
            ))?,
            failed_attempt: Regex::new(&format!(
                r"Failed (?:password|none) for (?:invalid user )?(\S+) from {IPV4} port (\d+)"
            ))?,
            max_auth_exceeded: Regex::new(&format!(
                r"error: maximum authentication attempts exceeded for (?:invalid user )?(\S+) from {IPV4} port (\d+)(?:\s+ssh2)? \[preauth\]"
            ))?,
            closed_authenticating: Regex::new(&format!(
                r"Connection closed by authenticating user (\S+) {IPV4} port (\d+) \[preauth\]"
            ))?,
            accepted: Regex::new(&format!(
                r"Accepted (?:password|publickey|keyboard-interactive/pam) for (\S+) from {IPV4} port (\d+)"
            ))?,
            disconnected: Regex::new(&format!(
                r"Disconnected from user (\S+) {IPV4} port (\d+)"
            ))?,
            closed: Regex::new(&format!(r"Connection closed by {IPV4} port (\d+)"))?,
        })
    }

    /// Classifies one line, stamping it with the time found in its prefix or
    /// with `now`.
    pub fn classify<Tz: TimeZone>(&self, line: &str, now: &DateTime<Tz>) -> Option<ClassifiedLine> {
        let auth_line = self.classify_message(line)?;
        Some(ClassifiedLine {
            timestamp_ms: self.timestamps.timestamp_ms(line, now),
            line: auth_line,
        })
    }

    pub fn classify_message(&self, line: &str) -> Option<AuthLine> {
        if let Some(caps) = self.connection.captures(line) {
            return Some(AuthLine::Connection {
                key: key_at(&caps, 1)?,
            });
        }
        if let Some(caps) = self.failed_attempt.captures(line) {
            return Some(AuthLine::FailedAttempt {
                key: key_at(&caps, 2)?,
                user: caps[1].to_string(),
            });
        }
        if let Some(caps) = self.max_auth_exceeded.captures(line) {
            return Some(AuthLine::MaxAuthExceeded {
                key: key_at(&caps, 2)?,
                user: caps[1].to_string(),
            });
        }
        if let Some(caps) = self.closed_authenticating.captures(line) {
            return Some(AuthLine::ClosedAuthenticating {
                key: key_at(&caps, 2)?,
                user: caps[1].to_string(),
            });
        }
        if let Some(caps) = self.accepted.captures(line) {
            return Some(AuthLine::Accepted {
                key: key_at(&caps, 2)?,
                user: caps[1].to_string(),
            });
        }
        if let Some(caps) = self.disconnected.captures(line) {
            return Some(AuthLine::Disconnected {
                key: key_at(&caps, 2)?,
                user: caps[1].to_string(),
            });
        }
        if let Some(caps) = self.closed.captures(line) {
            return Some(AuthLine::Closed {
                key: key_at(&caps, 1)?,
            });
        }
        None
    }
}

// Address at group `idx`, port at `idx + 1`.
fn key_at(caps: &Captures<'_>, idx: usize) -> Option<SessionKey> {
    SessionKey::parse(caps.get(idx)?.as_str(), caps.get(idx + 1)?.as_str())
}
