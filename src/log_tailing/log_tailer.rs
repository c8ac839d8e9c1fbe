use std::sync::Arc;

use chrono::Local;
use log::{debug, info, warn};
use tokio::io::AsyncBufRead;
use tokio::sync::watch;

use super::backoff::IdleBackoff;
use super::log_source::{LineReader, ReadOutcome};
use crate::event_classification::{AuthLine, ClassifiedLine, EventClassifier};
use crate::metrics::{EventContext, EventEmitter, SshEvent};
use crate::session_management::SessionStore;

/// Follows the auth log and turns sshd lines into session events.
///
/// Each complete line is classified, its side effects applied to the shared
/// [`SessionStore`] and the resulting event emitted right away. Between two
/// reads the tailer sleeps the base delay when a line was read and the
/// [`IdleBackoff`] delay otherwise. The shutdown channel is checked on every
/// iteration and interrupts both the read and the sleep.
pub struct LogTailer<R> {
    reader: LineReader<R>,
    classifier: EventClassifier,
    store: Arc<SessionStore>,
    emitter: EventEmitter,
    backoff: IdleBackoff,
    shutdown: watch::Receiver<bool>,
}

impl<R: AsyncBufRead + Unpin> LogTailer<R> {
    pub fn new(
        reader: R,
        classifier: EventClassifier,
        store: Arc<SessionStore>,
        emitter: EventEmitter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            reader: LineReader::new(reader),
            classifier,
            store,
            emitter,
            backoff: IdleBackoff::default(),
            shutdown,
        }
    }

    pub fn with_backoff(mut self, backoff: IdleBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Runs until shutdown is signalled (or its sender dropped).
    pub async fn run(mut self) {
        info!("monitoring ssh logins");
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let outcome = tokio::select! {
                outcome = self.reader.next_line() => outcome,
                _ = self.shutdown.changed() => break,
            };

            let delay = match outcome {
                Ok(ReadOutcome::Line(line)) => {
                    self.process_line(&line);
                    self.backoff.reset()
                }
                Ok(ReadOutcome::EndOfStream) => self.backoff.next_idle(),
                Err(e) => {
                    warn!("auth log read failed: {}", e);
                    self.backoff.next_idle()
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("auth log tailer stopped");
    }

    /// Classifies one line, updates the store and emits the event, if any.
    pub fn process_line(&self, line: &str) -> Option<SshEvent> {
        let classified = self.classifier.classify(line, &Local::now())?;
        let event = correlate(&self.store, classified);
        log_event(&event);
        // a refused event is already logged by the emitter
        let _ = self.emitter.emit(&event);
        Some(event)
    }
}

/// Applies the side effects of a classified line to the store and builds the
/// event to report.
///
/// A plain `Connection closed by` line carries no user: it is read back from
/// the session, and left empty when there is none. A tracked session is
/// stamped with the time of the line.
pub fn correlate(store: &SessionStore, classified: ClassifiedLine) -> SshEvent {
    let ts = classified.timestamp_ms;
    let event = match classified.line {
        AuthLine::Connection { key } => SshEvent::NewConnection(EventContext::new("", key, ts)),
        AuthLine::FailedAttempt { key, user } => {
            store.assign_user(&key, &user);
            SshEvent::LoginAttemptFailed(EventContext::new(user, key, ts))
        }
        AuthLine::MaxAuthExceeded { key, user } | AuthLine::ClosedAuthenticating { key, user } => {
            store.mark_pending_delete(&key);
            SshEvent::LoginFailedFinal(EventContext::new(user, key, ts))
        }
        AuthLine::Accepted { key, user } => {
            if !store.set_user(&key, &user) {
                debug!("login for {} before any traffic, session not tracked yet", key);
            }
            SshEvent::LoginSucceeded(EventContext::new(user, key, ts))
        }
        AuthLine::Disconnected { key, user } => {
            store.mark_pending_delete(&key);
            SshEvent::Logout(EventContext::new(user, key, ts))
        }
        AuthLine::Closed { key } => {
            let user = store.mark_pending_delete(&key).unwrap_or_default();
            SshEvent::Logout(EventContext::new(user, key, ts))
        }
    };
    store.record_event_time(&event.context().key, ts);
    event
}

fn log_event(event: &SshEvent) {
    let ctx = event.context();
    match event {
        SshEvent::NewConnection(_) => info!("[+] new ssh connection from {}", ctx.key),
        SshEvent::LoginAttemptFailed(_) => {
            info!("[!] failed login attempt: user='{}' client={}", ctx.user, ctx.key)
        }
        SshEvent::LoginFailedFinal(_) => {
            info!("[!] login failed, connection closed: user='{}' client={}", ctx.user, ctx.key)
        }
        SshEvent::LoginSucceeded(_) => {
            info!("[+] successful ssh login: user='{}' client={}", ctx.user, ctx.key)
        }
        SshEvent::Logout(_) => info!("[-] user disconnected: user='{}' client={}", ctx.user, ctx.key),
        SshEvent::RxBytes(..) | SshEvent::TxBytes(..) => {}
    }
}
