use chrono::Utc;
use std::fmt;
use std::net::IpAddr;

/// Identifies one remote SSH endpoint, rendered as `ip:port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub ip: IpAddr,
    pub port: u16,
}

impl SessionKey {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Builds a key from the textual address and port captured out of a log or
    /// netstat line. Returns `None` when either part is not a valid value.
    pub fn parse(ip: &str, port: &str) -> Option<Self> {
        let ip = ip.parse::<IpAddr>().ok()?;
        let port = port.parse::<u16>().ok()?;
        Some(Self { ip, port })
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Direction of SSH traffic seen from the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Bytes sent by the remote endpoint to the local sshd.
    Received,
    /// Bytes sent by the local sshd to the remote endpoint.
    Sent,
}

/// One remote endpoint's SSH interaction window.
///
/// Counters hold the traffic seen since the last flush. `pending_delete` is
/// raised once the connection is known to be over; the session then lives
/// until a flush finds both counters at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub key: SessionKey,
    /// Empty until a log line names the user.
    pub user: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub last_event_ms: i64,
    pub pending_delete: bool,
}

impl Session {
    pub fn new(key: SessionKey, user: &str) -> Self {
        Self {
            key,
            user: user.to_string(),
            bytes_received: 0,
            bytes_sent: 0,
            last_event_ms: Utc::now().timestamp_millis(),
            pending_delete: false,
        }
    }

    pub fn has_traffic(&self) -> bool {
        self.bytes_received != 0 || self.bytes_sent != 0
    }

    pub(crate) fn add_bytes(&mut self, direction: Direction, n: u64) {
        match direction {
            Direction::Received => self.bytes_received = self.bytes_received.saturating_add(n),
            Direction::Sent => self.bytes_sent = self.bytes_sent.saturating_add(n),
        }
    }

    pub(crate) fn touch(&mut self, at_ms: i64) {
        self.last_event_ms = at_ms;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            key: self.key,
            user: self.user.clone(),
            bytes_received: self.bytes_received,
            bytes_sent: self.bytes_sent,
            pending_delete: self.pending_delete,
        }
    }
}

/// Copy of a session handed out by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub key: SessionKey,
    pub user: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub pending_delete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_key_display_is_ip_colon_port() {
        let key = SessionKey::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 51000);
        assert_eq!(key.to_string(), "10.0.0.5:51000");
    }

    #[test]
    fn test_key_parse_rejects_bad_parts() {
        assert_eq!(
            SessionKey::parse("10.0.0.5", "51000"),
            Some(SessionKey::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 51000))
        );
        assert_eq!(SessionKey::parse("10.0.0.500", "22"), None);
        assert_eq!(SessionKey::parse("10.0.0.5", "70000"), None);
    }

    #[test]
    fn test_add_bytes_saturates() {
        let key = SessionKey::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1);
        let mut session = Session::new(key, "");
        session.add_bytes(Direction::Sent, u64::MAX);
        session.add_bytes(Direction::Sent, 10);
        assert_eq!(session.bytes_sent, u64::MAX);
        assert_eq!(session.bytes_received, 0);
        assert!(session.has_traffic());
    }
}
