use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Files consulted, in order, for a stable host identifier.
pub const HOST_ID_SOURCES: [&str; 3] = [
    "/sys/class/dmi/id/product_uuid",
    "/etc/machine-id",
    "/var/lib/dbus/machine-id",
];

/// Opaque identifier of the monitored device.
///
/// Built once at startup and shared by reference with every component that
/// normalizes events. Identifiers are upper-cased with dashes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    id: String,
}

impl DeviceIdentity {
    pub fn new(raw: &str) -> Self {
        Self {
            id: raw.trim().replace('-', "").to_uppercase(),
        }
    }

    /// Uses `configured` when given, otherwise the first readable host id file.
    /// Falls back to an empty identifier.
    pub fn resolve(configured: Option<&str>) -> Self {
        if let Some(id) = configured {
            debug!("using configured device id");
            return Self::new(id);
        }
        Self::from_sources(&HOST_ID_SOURCES).unwrap_or_else(|| {
            warn!("no host identifier found, device id left empty");
            Self::new("")
        })
    }

    pub fn from_sources<P: AsRef<Path>>(paths: &[P]) -> Option<Self> {
        paths.iter().find_map(|path| {
            let content = fs::read_to_string(path.as_ref()).ok()?;
            let content = content.trim();
            if content.is_empty() {
                return None;
            }
            debug!("device id read from {}", path.as_ref().display());
            Some(Self::new(content))
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}
