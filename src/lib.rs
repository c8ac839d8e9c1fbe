pub mod configuration;
pub mod controller;
pub mod data_capture;
pub mod error_handling;
pub mod event_classification;
pub mod log_tailing;
pub mod metrics;
pub mod network;
pub mod session_management;
pub mod statistics;
