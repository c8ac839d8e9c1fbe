//! Host network facts the engine needs at startup: the address of the tracked
//! interface and the SSH sessions that were already open.

pub mod connection_table;
pub mod local_address;

pub use connection_table::{established_ssh_sessions, parse_netstat};
pub use local_address::{first_usable_ipv4, resolve_local_ipv4};
