use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info};

use super::packet_source::PacketSource;
use super::types::CapturedFrame;
use crate::error_handling::types::CaptureError;
use crate::session_management::{Direction, SessionKey, SessionStore};

/// Attributes captured SSH packets to sessions and adds their size to the
/// session counters.
pub struct TrafficSniffer {
    store: Arc<SessionStore>,
    local_address: Ipv4Addr,
    listen_port: u16,
}

impl TrafficSniffer {
    pub fn new(store: Arc<SessionStore>, local_address: Ipv4Addr, listen_port: u16) -> Self {
        Self {
            store,
            local_address,
            listen_port,
        }
    }

    /// Resolves which session a frame belongs to and in which direction it
    /// flows.
    ///
    /// Outbound traffic from the local SSH port is keyed by its destination and
    /// counted as sent. Anything addressed to the local host is keyed by its
    /// source and counted as received. Frames that are not IPv4/TCP or that
    /// match neither case yield `None`.
    pub fn session_key(&self, frame: &CapturedFrame) -> Option<(SessionKey, Direction)> {
        let (network, transport) = match (frame.network, frame.transport) {
            (Some(n), Some(t)) => (n, t),
            _ => return None,
        };

        if network.source == self.local_address && transport.source_port == self.listen_port {
            let key = SessionKey::new(
                IpAddr::V4(network.destination),
                transport.destination_port,
            );
            Some((key, Direction::Sent))
        } else if network.destination == self.local_address {
            let key = SessionKey::new(IpAddr::V4(network.source), transport.source_port);
            Some((key, Direction::Received))
        } else {
            None
        }
    }

    /// Credits one frame to its session. Returns the key it was credited to.
    pub fn record(&self, frame: &CapturedFrame) -> Option<SessionKey> {
        let (key, direction) = self.session_key(frame)?;
        self.store
            .accumulate_bytes(&key, direction, u64::from(frame.capture_len));
        Some(key)
    }

    /// Blocking capture loop, meant for a dedicated thread.
    ///
    /// The flag is checked between reads; the source's read timeout bounds how
    /// long a stop request waits. Returns the number of frames credited.
    pub fn run<S: PacketSource>(
        &self,
        source: &mut S,
        shutdown: &AtomicBool,
    ) -> Result<u64, CaptureError> {
        info!(
            "sniffing ssh traffic for {}:{}",
            self.local_address, self.listen_port
        );
        let mut credited = 0u64;

        while !shutdown.load(Ordering::Relaxed) {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    if self.record(&frame).is_some() {
                        credited += 1;
                    } else {
                        debug!("ignoring frame not attributable to a session: {:?}", frame);
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    error!("Capture stopped: {}", e);
                    return Err(e);
                }
            }
        }

        info!("traffic sniffer stopped after {} frames", credited);
        Ok(credited)
    }
}
