use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_AUTH_LOG_PATH: &str = "/var/log/auth.log";

/// Runtime parameters of the guard.
///
/// Keys in the TOML file use camelCase (`interfaceTracked`, `sshListenPort`,
/// `intervalRateSeconds`, `authLogPath`, `deviceId`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Network interface whose first non-loopback IPv4 address is "local".
    #[serde(default)]
    pub interface_tracked: String,

    /// Port sshd listens on. `0` is read as the default port.
    #[serde(default = "default_ssh_port")]
    pub ssh_listen_port: u16,

    /// Seconds between two traffic flushes.
    #[serde(default = "default_interval")]
    pub interval_rate_seconds: u64,

    /// Authentication log followed by the tailer.
    #[serde(default = "default_auth_log_path")]
    pub auth_log_path: PathBuf,

    /// Overrides the identity read from the host.
    #[serde(default)]
    pub device_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface_tracked: String::new(),
            ssh_listen_port: DEFAULT_SSH_PORT,
            interval_rate_seconds: DEFAULT_INTERVAL_SECS,
            auth_log_path: PathBuf::from(DEFAULT_AUTH_LOG_PATH),
            device_id: None,
        }
    }
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_auth_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_AUTH_LOG_PATH)
}
