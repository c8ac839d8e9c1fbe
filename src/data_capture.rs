//! # Data Capture Module
//!
//! Live capture of SSH traffic and its attribution to sessions.
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────┐
//! │ PcapSource   │───▶│ TrafficSniffer │───▶│ SessionStore │
//! │ tcp port N   │    │ key+direction  │    │ byte counters│
//! └──────────────┘    └────────────────┘    └──────────────┘
//! ```
//!
//! The sniffer only sees [`CapturedFrame`]s through the [`PacketSource`]
//! trait, so it can be driven without a capture device.

pub mod packet_source;
pub mod traffic_sniffer;
pub mod types;

pub use packet_source::{decode_frame, PacketSource, PcapSource};
pub use traffic_sniffer::TrafficSniffer;
pub use types::{CapturedFrame, NetworkLayer, TransportLayer};
