//! Event emission
//!
//! Components:
//! - `event`: the closed set of SSH events and their normalized form.
//! - `sink`: the sink trait, the channel sink and the JSON-lines writer.
//! - `device_identity`: the identifier stamped on every event.

pub mod device_identity;
pub mod event;
pub mod sink;

pub use device_identity::DeviceIdentity;
pub use event::{EventContext, FieldValue, NormalizedEvent, SshEvent};
pub use sink::{write_json_lines, ChannelSink, EventEmitter, EventSink};
