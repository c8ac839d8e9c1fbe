use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::byte_format::format_bytes;
use crate::metrics::{EventContext, EventEmitter, SshEvent};
use crate::session_management::{Direction, SessionSnapshot, SessionStore};

/// Periodically turns the traffic counters of the store into byte events.
///
/// Every tick drains the store: a session with traffic yields an RxBytes
/// and/or TxBytes event stamped with the flush time and its counters restart
/// at zero, a closed session without traffic is dropped. Counters whose event
/// the sink refused go back into the store for the next tick.
pub struct StatsFlusher {
    store: Arc<SessionStore>,
    emitter: EventEmitter,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StatsFlusher {
    pub fn new(
        store: Arc<SessionStore>,
        emitter: EventEmitter,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            emitter,
            interval,
            shutdown,
        }
    }

    /// Ticks until shutdown, then flushes one last time.
    pub async fn run(mut self) {
        info!("flushing ssh session statistics every {:?}", self.interval);
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush();
                }
                _ = self.shutdown.changed() => break,
            }
        }

        let emitted = self.flush();
        info!("final statistics flush emitted {} events", emitted);
    }

    /// One drain of the store. Returns the number of events delivered.
    pub fn flush(&self) -> usize {
        let now_ms = Utc::now().timestamp_millis();
        let snapshots = self.store.drain_due();
        if snapshots.is_empty() {
            debug!("no ssh traffic since last flush");
            return 0;
        }

        let mut delivered = 0;
        for snapshot in &snapshots {
            info!(
                "[~] {} ({}) rx {} tx {}",
                snapshot.key,
                display_user(snapshot),
                format_bytes(snapshot.bytes_received),
                format_bytes(snapshot.bytes_sent)
            );
            delivered += self.emit_direction(snapshot, Direction::Received, now_ms);
            delivered += self.emit_direction(snapshot, Direction::Sent, now_ms);
        }
        delivered
    }

    fn emit_direction(&self, snapshot: &SessionSnapshot, direction: Direction, now_ms: i64) -> usize {
        let ctx = EventContext::new(snapshot.user.as_str(), snapshot.key, now_ms);
        let event = match direction {
            Direction::Received if snapshot.bytes_received > 0 => {
                SshEvent::RxBytes(ctx, snapshot.bytes_received)
            }
            Direction::Sent if snapshot.bytes_sent > 0 => SshEvent::TxBytes(ctx, snapshot.bytes_sent),
            _ => return 0,
        };

        match self.emitter.emit(&event) {
            Ok(()) => 1,
            Err(_) => {
                self.store.requeue(snapshot, direction);
                0
            }
        }
    }
}

fn display_user(snapshot: &SessionSnapshot) -> &str {
    if snapshot.user.is_empty() {
        "unknown"
    } else {
        &snapshot.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::SinkError;
    use crate::data_capture::{CapturedFrame, TrafficSniffer};
    use crate::event_classification::EventClassifier;
    use crate::log_tailing::correlate;
    use crate::metrics::{ChannelSink, DeviceIdentity, EventSink, FieldValue, NormalizedEvent};
    use chrono::Local;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct ClosedSink;

    impl EventSink for ClosedSink {
        fn emit(&self, _event: NormalizedEvent) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    fn key() -> crate::session_management::SessionKey {
        crate::session_management::SessionKey::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 51000)
    }

    fn channel_flusher() -> (
        StatsFlusher,
        Arc<SessionStore>,
        UnboundedReceiver<NormalizedEvent>,
        watch::Sender<bool>,
    ) {
        let _ = env_logger::builder().is_test(true).try_init();
        let store = Arc::new(SessionStore::new());
        let (sink, rx) = ChannelSink::new();
        let emitter = EventEmitter::new(Arc::new(sink), Arc::new(DeviceIdentity::new("dev-1")));
        let (tx, shutdown) = watch::channel(false);
        let flusher = StatsFlusher::new(store.clone(), emitter, Duration::from_secs(10), shutdown);
        (flusher, store, rx, tx)
    }

    fn drain(rx: &mut UnboundedReceiver<NormalizedEvent>) -> Vec<NormalizedEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_flush_emits_one_event_per_nonzero_direction() {
        let (flusher, store, mut rx, _tx) = channel_flusher();
        store.assign_user(&key(), "alice");
        store.accumulate_bytes(&key(), Direction::Received, 120);

        assert_eq!(flusher.flush(), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tag("eventType"), Some("ssh_session_rx_bytes"));
        assert_eq!(events[0].tag("user"), Some("alice"));
        assert_eq!(events[0].field("connbytes"), Some(FieldValue::UInt(120)));
        assert_eq!(store.get(&key()).unwrap().bytes_received, 0);
    }

    #[test]
    fn test_flush_without_traffic_emits_nothing() {
        let (flusher, store, mut rx, _tx) = channel_flusher();
        store.get_or_create(&key(), "alice");

        assert_eq!(flusher.flush(), 0);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_refused_events_are_requeued() {
        let store = Arc::new(SessionStore::new());
        let emitter = EventEmitter::new(Arc::new(ClosedSink), Arc::new(DeviceIdentity::new("x")));
        let (_tx, shutdown) = watch::channel(false);
        let flusher = StatsFlusher::new(store.clone(), emitter, Duration::from_secs(1), shutdown);
        store.accumulate_bytes(&key(), Direction::Received, 70);
        store.accumulate_bytes(&key(), Direction::Sent, 30);
        store.mark_pending_delete(&key());

        assert_eq!(flusher.flush(), 0);

        let session = store.get(&key()).unwrap();
        assert_eq!((session.bytes_received, session.bytes_sent), (70, 30));
        assert!(session.pending_delete);
    }

    #[test]
    fn test_login_traffic_logout_scenario() {
        let (flusher, store, mut rx, _tx) = channel_flusher();
        let classifier = EventClassifier::new().unwrap();
        let sniffer = TrafficSniffer::new(store.clone(), Ipv4Addr::new(10, 0, 0, 9), 22);
        let device = DeviceIdentity::new("dev-1");
        let now = Local::now();
        let classify = |line: &str| classifier.classify(line, &now).unwrap();

        let conn = correlate(
            &store,
            classify("Jun 1 10:00:00 host sshd[1]: Connection from 10.0.0.5 port 51000 on 10.0.0.9 port 22"),
        )
        .normalize(&device);
        assert_eq!(conn.tag("ip"), Some("10.0.0.5"));
        assert_eq!(conn.tag("port"), Some("51000"));
        assert_eq!(conn.tag("eventType"), Some("conn"));

        let login = correlate(
            &store,
            classify("Jun 1 10:00:02 host sshd[1]: Accepted password for alice from 10.0.0.5 port 51000"),
        )
        .normalize(&device);
        assert_eq!(login.tag("eventType"), Some("login"));
        assert_eq!(login.tag("user"), Some("alice"));

        let frame = CapturedFrame::tcp(
            (Ipv4Addr::new(10, 0, 0, 5), 51000),
            (Ipv4Addr::new(10, 0, 0, 9), 22),
            120,
        );
        assert_eq!(sniffer.record(&frame), Some(key()));
        assert_eq!(store.get(&key()).unwrap().bytes_received, 120);

        flusher.flush();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tag("eventType"), Some("ssh_session_rx_bytes"));
        assert_eq!(events[0].field("connbytes"), Some(FieldValue::UInt(120)));
        assert_eq!(store.get(&key()).unwrap().bytes_received, 0);

        let logout = correlate(
            &store,
            classify("Jun 1 10:05:00 host sshd[1]: Disconnected from user alice 10.0.0.5 port 51000"),
        );
        assert_eq!(logout.event_type(), "logout");
        assert!(store.get(&key()).unwrap().pending_delete);

        assert_eq!(flusher.flush(), 0);
        assert!(store.get(&key()).is_none());
    }

    #[test]
    fn test_closed_session_traffic_reported_before_removal() {
        let (flusher, store, mut rx, _tx) = channel_flusher();
        store.assign_user(&key(), "bob");
        store.mark_pending_delete(&key());
        store.accumulate_bytes(&key(), Direction::Sent, 2048);

        assert_eq!(flusher.flush(), 1);
        assert!(store.get(&key()).is_some());
        assert_eq!(drain(&mut rx)[0].tag("eventType"), Some("ssh_session_tx_bytes"));

        flusher.flush();
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_flushes_on_interval_and_at_shutdown() {
        let (flusher, store, mut rx, tx) = channel_flusher();
        store.accumulate_bytes(&key(), Direction::Received, 10);
        let handle = tokio::spawn(flusher.run());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(drain(&mut rx).len(), 1);

        store.accumulate_bytes(&key(), Direction::Sent, 5);
        tx.send(true).unwrap();
        handle.await.unwrap();

        let last = drain(&mut rx);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].tag("eventType"), Some("ssh_session_tx_bytes"));
    }
}
