//! Common data types used across the data_capture subsystem.

use std::net::Ipv4Addr;

/// IPv4 addresses of a captured packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkLayer {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

/// TCP ports of a captured packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportLayer {
    pub source_port: u16,
    pub destination_port: u16,
}

/// A decoded packet as seen by the traffic sniffer.
///
/// Either layer is `None` when the frame was not IPv4 or not TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedFrame {
    pub network: Option<NetworkLayer>,
    pub transport: Option<TransportLayer>,
    /// Bytes captured on the wire for this frame.
    pub capture_len: u32,
}

impl CapturedFrame {
    pub fn tcp(
        source: (Ipv4Addr, u16),
        destination: (Ipv4Addr, u16),
        capture_len: u32,
    ) -> Self {
        Self {
            network: Some(NetworkLayer {
                source: source.0,
                destination: destination.0,
            }),
            transport: Some(TransportLayer {
                source_port: source.1,
                destination_port: destination.1,
            }),
            capture_len,
        }
    }
}
