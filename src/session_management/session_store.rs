use chrono::Utc;
use super::session::{Direction, Session, SessionKey, SessionSnapshot};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The shared table of SSH sessions.
///
/// The log tailer, the traffic sniffer and the stats flusher all go through
/// these operations; each one takes the single lock for one map access (the
/// drain walks the whole map) and never hands out references into the table.
/// None of them can fail: an absent key turns updates into no-ops.
///
/// # Examples
///
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
/// use ssh_guard::session_management::{Direction, SessionKey, SessionStore};
///
/// let store = SessionStore::new();
/// let key = SessionKey::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 51000);
///
/// store.accumulate_bytes(&key, Direction::Received, 120);
/// let drained = store.drain_due();
/// assert_eq!(drained[0].bytes_received, 120);
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves the map in a consistent state,
    // every critical section being a single field update.
    fn table(&self) -> MutexGuard<'_, HashMap<SessionKey, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts the sessions found established at startup. Existing entries are
    /// left untouched.
    pub fn seed(&self, initial: HashMap<SessionKey, String>) {
        let mut table = self.table();
        for (key, user) in initial {
            debug!("seeding session {} (user '{}')", key, user);
            table
                .entry(key)
                .or_insert_with(|| Session::new(key, &user));
        }
    }

    /// Returns the session for `key`, creating a zero-valued one with `user`
    /// when absent.
    pub fn get_or_create(&self, key: &SessionKey, user: &str) -> SessionSnapshot {
        self.table()
            .entry(*key)
            .or_insert_with(|| Session::new(*key, user))
            .snapshot()
    }

    /// Overwrites the user of an existing session. Returns `false` when the
    /// key is unknown.
    pub fn set_user(&self, key: &SessionKey, user: &str) -> bool {
        match self.table().get_mut(key) {
            Some(session) => {
                session.user = user.to_string();
                true
            }
            None => false,
        }
    }

    /// Sets the user of the session, creating the session if needed.
    pub fn assign_user(&self, key: &SessionKey, user: &str) {
        let mut table = self.table();
        let session = table
            .entry(*key)
            .or_insert_with(|| Session::new(*key, user));
        session.user = user.to_string();
    }

    /// Flags the session as finished. Idempotent; the flag is never cleared.
    ///
    /// Returns the stored user when the session exists, so that callers can
    /// name the user of a disconnect whose log line does not carry it.
    pub fn mark_pending_delete(&self, key: &SessionKey) -> Option<String> {
        let mut table = self.table();
        let session = table.get_mut(key)?;
        if !session.pending_delete {
            trace!("session {} pending delete", key);
        }
        session.pending_delete = true;
        Some(session.user.clone())
    }

    /// Adds `n` bytes to one counter, creating the session when traffic shows
    /// up before any log line did.
    pub fn accumulate_bytes(&self, key: &SessionKey, direction: Direction, n: u64) {
        let mut table = self.table();
        let session = table.entry(*key).or_insert_with(|| {
            trace!("session {} created from traffic", key);
            Session::new(*key, "")
        });
        session.add_bytes(direction, n);
        session.touch(Utc::now().timestamp_millis());
    }

    /// Stamps the session with the time of the log line that last concerned
    /// it. Returns `false` when the key is unknown.
    pub fn record_event_time(&self, key: &SessionKey, at_ms: i64) -> bool {
        match self.table().get_mut(key) {
            Some(session) => {
                session.touch(at_ms);
                true
            }
            None => false,
        }
    }

    /// Puts back counters of a drained snapshot that could not be delivered.
    pub fn requeue(&self, snapshot: &SessionSnapshot, direction: Direction) {
        let n = match direction {
            Direction::Received => snapshot.bytes_received,
            Direction::Sent => snapshot.bytes_sent,
        };
        if n == 0 {
            return;
        }
        let mut table = self.table();
        let session = table
            .entry(snapshot.key)
            .or_insert_with(|| Session::new(snapshot.key, &snapshot.user));
        session.add_bytes(direction, n);
        session.pending_delete |= snapshot.pending_delete;
    }

    /// Collects every session with traffic since the last drain and resets its
    /// counters. Pending-delete sessions without traffic are removed.
    ///
    /// A pending-delete session that still had traffic is reported and kept,
    /// so it is only removed by the following drain.
    pub fn drain_due(&self) -> Vec<SessionSnapshot> {
        let mut drained = Vec::new();
        let mut table = self.table();
        table.retain(|key, session| {
            if session.has_traffic() {
                drained.push(session.snapshot());
                session.bytes_received = 0;
                session.bytes_sent = 0;
                return true;
            }
            if session.pending_delete {
                debug!("removing closed session {}", key);
                return false;
            }
            true
        });
        drained
    }

    pub fn user_of(&self, key: &SessionKey) -> Option<String> {
        self.table().get(key).map(|s| s.user.clone())
    }

    pub fn get(&self, key: &SessionKey) -> Option<Session> {
        self.table().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}
