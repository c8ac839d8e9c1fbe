use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command line of the guard.
///
/// Every option can also be given through an `SSH_GUARD_*` environment variable.
/// Values given here take precedence over the configuration file.
///
/// # Examples
///
/// ```text
/// ssh-guard /etc/ssh-guard.toml --interface eth0 --interval 30
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "ssh-guard")]
#[command(version)]
#[command(about = "Correlates sshd auth log events with per-session SSH traffic")]
pub struct Args {
    /// Path to a TOML configuration file
    pub config_file: Option<PathBuf>,

    /// Network interface to sniff and resolve the local address from
    ///
    /// # Command Line
    /// Use `--interface <NAME>` or `SSH_GUARD_INTERFACE`
    #[arg(long, env = "SSH_GUARD_INTERFACE")]
    pub interface: Option<String>,

    /// Port sshd listens on
    ///
    /// # Command Line
    /// Use `--port <PORT>` or `SSH_GUARD_PORT`
    #[arg(long, env = "SSH_GUARD_PORT")]
    pub port: Option<u16>,

    /// Seconds between two traffic flushes
    ///
    /// # Command Line
    /// Use `--interval <SECONDS>` or `SSH_GUARD_INTERVAL`
    #[arg(long, env = "SSH_GUARD_INTERVAL")]
    pub interval: Option<u64>,

    /// Authentication log to follow
    ///
    /// # Command Line
    /// Use `--auth-log <PATH>` or `SSH_GUARD_AUTH_LOG`
    #[arg(long, env = "SSH_GUARD_AUTH_LOG")]
    pub auth_log: Option<PathBuf>,
}

impl Config {
    /// Reads and parses a TOML configuration file. The result is not validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    /// Builds the effective configuration: file (if any), then command-line
    /// overrides, then validation.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(interface) = &args.interface {
            self.interface_tracked = interface.clone();
        }
        if let Some(port) = args.port {
            self.ssh_listen_port = port;
        }
        if let Some(interval) = args.interval {
            self.interval_rate_seconds = interval;
        }
        if let Some(path) = &args.auth_log {
            self.auth_log_path = path.clone();
        }
    }

    /// Checks the values and normalizes a zero listen port to the default one.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.interface_tracked.trim().is_empty() {
            return Err(ConfigError::MissingInterface);
        }
        if self.ssh_listen_port == 0 {
            warn!(
                "sshListenPort is 0, falling back to port {}",
                DEFAULT_SSH_PORT
            );
            self.ssh_listen_port = DEFAULT_SSH_PORT;
        }
        if self.interval_rate_seconds == 0 {
            return Err(ConfigError::NotInRange(
                "intervalRateSeconds must be at least 1".to_string(),
            ));
        }
        if let Some(id) = &self.device_id {
            if id.trim().is_empty() {
                self.device_id = None;
            }
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.interval_rate_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["ssh-guard"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap_or_else(|e| panic!("{}", e))
    }

    #[test]
    fn test_from_toml_str_with_camel_case_keys() {
        let config = Config::from_toml_str(
            r#"
            interfaceTracked = "eth0"
            sshListenPort = 2222
            intervalRateSeconds = 30
            authLogPath = "/var/log/secure"
            "#,
        )
        .unwrap();

        assert_eq!(config.interface_tracked, "eth0");
        assert_eq!(config.ssh_listen_port, 2222);
        assert_eq!(config.interval_rate_seconds, 30);
        assert_eq!(config.auth_log_path, PathBuf::from("/var/log/secure"));
        assert_eq!(config.device_id, None);
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = Config::from_toml_str("interfaceTracked = \"wlan0\"").unwrap();

        assert_eq!(config.ssh_listen_port, DEFAULT_SSH_PORT);
        assert_eq!(config.interval_rate_seconds, DEFAULT_INTERVAL_SECS);
        assert_eq!(config.auth_log_path, PathBuf::from(DEFAULT_AUTH_LOG_PATH));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Config::from_toml_str("interfaceTraced = \"eth0\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_validate_zero_port_falls_back_to_default() {
        let mut config = Config {
            interface_tracked: "eth0".to_string(),
            ssh_listen_port: 0,
            ..Config::default()
        };
        config.validate().unwrap();
        assert_eq!(config.ssh_listen_port, 22);
    }

    #[test]
    fn test_validate_rejects_missing_interface_and_zero_interval() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingInterface)
        ));

        let mut config = Config {
            interface_tracked: "eth0".to_string(),
            interval_rate_seconds: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NotInRange(_))));
    }

    #[test]
    #[serial]
    fn test_load_file_then_command_line_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "interfaceTracked = \"eth0\"").unwrap();
        writeln!(file, "intervalRateSeconds = 5").unwrap();
        writeln!(file, "deviceId = \"ABC123\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = Config::load(&args(&[path.as_str(), "--interface", "eth1", "--port", "2200"])).unwrap();

        assert_eq!(config.interface_tracked, "eth1");
        assert_eq!(config.ssh_listen_port, 2200);
        assert_eq!(config.interval_rate_seconds, 5);
        assert_eq!(config.device_id.as_deref(), Some("ABC123"));
    }

    #[test]
    #[serial]
    fn test_load_reads_environment_overrides() {
        std::env::set_var("SSH_GUARD_INTERFACE", "ens3");
        std::env::set_var("SSH_GUARD_INTERVAL", "60");
        let result = Config::load(&args(&[]));
        std::env::remove_var("SSH_GUARD_INTERFACE");
        std::env::remove_var("SSH_GUARD_INTERVAL");

        let config = result.unwrap();
        assert_eq!(config.interface_tracked, "ens3");
        assert_eq!(config.interval_rate_seconds, 60);
        assert_eq!(config.ssh_listen_port, 22);
    }

    #[test]
    #[serial]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load(&args(&["/nonexistent/ssh-guard.toml"])).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
