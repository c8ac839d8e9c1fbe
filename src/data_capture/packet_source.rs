use etherparse::{InternetSlice, SlicedPacket, TransportSlice};
use log::info;
use pcap::{Active, Capture, Linktype};

use super::types::{CapturedFrame, NetworkLayer, TransportLayer};
use crate::error_handling::types::CaptureError;

const SNAPLEN: i32 = 1600;
/// Read timeout of the capture handle, bounds how long shutdown goes unnoticed.
const READ_TIMEOUT_MS: i32 = 200;

/// Supplier of decoded frames for the traffic sniffer.
pub trait PacketSource: Send {
    /// Next frame, `Ok(None)` when nothing arrived before the read timeout.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;
}

/// Live capture on one interface, filtered to the SSH port.
pub struct PcapSource {
    capture: Capture<Active>,
    ethernet: bool,
}

impl PcapSource {
    /// Opens the interface in promiscuous mode and installs `tcp port <port>`.
    ///
    /// Errors
    /// - [`CaptureError::DeviceOpenFailed`] when the device is missing or the
    ///   process lacks capture privileges.
    /// - [`CaptureError::FilterFailed`] when the BPF filter is rejected.
    pub fn open(interface: &str, port: u16) -> Result<Self, CaptureError> {
        let mut capture = Capture::from_device(interface)
            .map_err(|e| CaptureError::DeviceOpenFailed(format!("{}: {}", interface, e)))?
            .promisc(true)
            .snaplen(SNAPLEN)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(|e| CaptureError::DeviceOpenFailed(format!("{}: {}", interface, e)))?;

        let filter = format!("tcp port {}", port);
        capture
            .filter(&filter, true)
            .map_err(|e| CaptureError::FilterFailed(format!("{}: {}", filter, e)))?;

        let ethernet = capture.get_datalink() == Linktype::ETHERNET;
        info!(
            "capturing ssh traffic on {} ({}, link type {:?})",
            interface,
            filter,
            capture.get_datalink()
        );
        Ok(Self { capture, ethernet })
    }
}

impl PacketSource for PcapSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Some(decode_frame(
                packet.data,
                packet.header.caplen,
                self.ethernet,
            ))),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(CaptureError::ReadFailed(e.to_string())),
        }
    }
}

/// Extracts the IPv4 and TCP fields of a frame. Undecodable frames come back
/// with both layers empty.
pub fn decode_frame(data: &[u8], capture_len: u32, ethernet: bool) -> CapturedFrame {
    let sliced = if ethernet {
        SlicedPacket::from_ethernet(data)
    } else {
        SlicedPacket::from_ip(data)
    };

    let mut frame = CapturedFrame {
        network: None,
        transport: None,
        capture_len,
    };
    let sliced = match sliced {
        Ok(s) => s,
        Err(_) => return frame,
    };

    if let Some(InternetSlice::Ipv4(header, _)) = &sliced.ip {
        frame.network = Some(NetworkLayer {
            source: header.source_addr(),
            destination: header.destination_addr(),
        });
    }
    if let Some(TransportSlice::Tcp(tcp)) = &sliced.transport {
        frame.transport = Some(TransportLayer {
            source_port: tcp.source_port(),
            destination_port: tcp.destination_port(),
        });
    }
    frame
}
