use std::sync::Arc;

use log::{info, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::device_identity::DeviceIdentity;
use super::event::{NormalizedEvent, SshEvent};
use crate::error_handling::types::SinkError;

/// Receiver of normalized events.
///
/// `emit` is called from the producing task and must not block. Batching,
/// transport and retries are the implementor's business.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: NormalizedEvent) -> Result<(), SinkError>;
}

/// Sink forwarding into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<NormalizedEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<NormalizedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: NormalizedEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Closed)
    }
}

/// Normalizes events with the device identity and hands them to the sink.
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn EventSink>,
    device: Arc<DeviceIdentity>,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn EventSink>, device: Arc<DeviceIdentity>) -> Self {
        Self { sink, device }
    }

    pub fn emit(&self, event: &SshEvent) -> Result<(), SinkError> {
        self.sink
            .emit(event.normalize(&self.device))
            .map_err(|e| {
                warn!(
                    "dropping {} event for {}: {}",
                    event.event_type(),
                    event.context().key,
                    e
                );
                e
            })
    }
}

/// Writes every received event as one JSON document per line until the
/// channel closes. Returns the number of events written.
pub async fn write_json_lines<W>(
    mut rx: UnboundedReceiver<NormalizedEvent>,
    mut writer: W,
) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(event) = rx.recv().await {
        let mut line = serde_json::to_vec(&event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        written += 1;
    }
    info!("event writer stopped after {} events", written);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::event::EventContext;
    use crate::session_management::SessionKey;
    use std::net::{IpAddr, Ipv4Addr};

    fn logout() -> SshEvent {
        SshEvent::Logout(EventContext::new(
            "alice",
            SessionKey::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 51000),
            0,
        ))
    }

    #[tokio::test]
    async fn test_emitter_normalizes_with_device_id() {
        let (sink, mut rx) = ChannelSink::new();
        let emitter = EventEmitter::new(Arc::new(sink), Arc::new(DeviceIdentity::new("dev-1")));

        emitter.emit(&logout()).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.device_id, "DEV1");
        assert_eq!(event.tag("eventType"), Some("logout"));
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_fails() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        let emitter = EventEmitter::new(Arc::new(sink), Arc::new(DeviceIdentity::new("")));

        assert_eq!(emitter.emit(&logout()), Err(SinkError::Closed));
    }

    #[tokio::test]
    async fn test_write_json_lines_until_channel_closes() {
        let (sink, rx) = ChannelSink::new();
        let device = DeviceIdentity::new("x");
        sink.emit(logout().normalize(&device)).unwrap();
        sink.emit(logout().normalize(&device)).unwrap();
        drop(sink);

        let mut out = Vec::new();
        let written = write_json_lines(rx, &mut out).await.unwrap();

        assert_eq!(written, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["tags"]["user"], "alice");
        assert_eq!(first["fields"]["authevent"], 1);
    }
}
