use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingInterface,
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingInterface => write!(f, "No tracked interface configured"),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures opening the authentication log the tailer follows.
#[derive(Debug)]
pub enum LogSourceError {
    OpenFailed(String, std::io::Error),
    SeekFailed(String, std::io::Error),
}

impl fmt::Display for LogSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSourceError::OpenFailed(path, e) => {
                write!(f, "Unable to open auth log {}: {}", path, e)
            }
            LogSourceError::SeekFailed(path, e) => {
                write!(f, "Unable to seek to the end of auth log {}: {}", path, e)
            }
        }
    }
}

impl std::error::Error for LogSourceError {}

/// Failures of the packet capture collaborator.
#[derive(Debug)]
pub enum CaptureError {
    DeviceOpenFailed(String),
    FilterFailed(String),
    ReadFailed(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceOpenFailed(e) => write!(f, "Capture device open failed: {}", e),
            CaptureError::FilterFailed(e) => write!(f, "Capture filter install failed: {}", e),
            CaptureError::ReadFailed(e) => write!(f, "Capture read failed: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug)]
pub enum NetworkError {
    InterfaceLookupFailed(String),
    InterfaceNotFound(String),
    NoIpv4Address(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::InterfaceLookupFailed(e) => write!(f, "Interface lookup failed: {}", e),
            NetworkError::InterfaceNotFound(name) => write!(f, "Interface {} not found", name),
            NetworkError::NoIpv4Address(name) => {
                write!(f, "No usable IPv4 address on interface {}", name)
            }
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug, PartialEq)]
pub enum SinkError {
    Closed,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Closed => write!(f, "Event sink closed"),
        }
    }
}

impl std::error::Error for SinkError {}

#[derive(Debug)]
pub enum GuardError {
    ConfigurationError(ConfigError),
    LogSourceError(LogSourceError),
    CaptureError(CaptureError),
    NetworkError(NetworkError),
    InitializationFailed(String),
    TaskFailed(String),
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            GuardError::LogSourceError(e) => write!(f, "Log source error: {}", e),
            GuardError::CaptureError(e) => write!(f, "Capture error: {}", e),
            GuardError::NetworkError(e) => write!(f, "Network error: {}", e),
            GuardError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
            GuardError::TaskFailed(e) => write!(f, "Task failed: {}", e),
        }
    }
}

impl std::error::Error for GuardError {}

impl From<ConfigError> for GuardError {
    fn from(err: ConfigError) -> Self {
        GuardError::ConfigurationError(err)
    }
}

impl From<LogSourceError> for GuardError {
    fn from(err: LogSourceError) -> Self {
        GuardError::LogSourceError(err)
    }
}

impl From<CaptureError> for GuardError {
    fn from(err: CaptureError) -> Self {
        GuardError::CaptureError(err)
    }
}

impl From<regex::Error> for GuardError {
    fn from(err: regex::Error) -> Self {
        GuardError::InitializationFailed(err.to_string())
    }
}

impl From<NetworkError> for GuardError {
    fn from(err: NetworkError) -> Self {
        GuardError::NetworkError(err)
    }
}
