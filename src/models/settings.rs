use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wire protocol used for SCPI connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComProtocol {
    #[default]
    Vxi11,
    Raw,
}

/// Discovery mechanism used for an instrument search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverMode {
    #[default]
    Vxi11Broadcast,
    Mdns,
}

/// Persisted application settings: per-operation timeouts, protocol
/// selection and the SCPI log display toggles.
///
/// Every field has a default so a partial or missing settings file still
/// loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timeout_discover_ms: u64,
    pub timeout_scpi_ms: u64,
    pub timeout_screenshot_ms: u64,
    pub com_protocol: ComProtocol,
    /// TCP port used in raw-socket mode
    pub raw_port: u16,
    pub use_mdns_discovery: bool,
    /// Echo sent commands into the SCPI log
    pub show_sent_scpi: bool,
    pub scpi_show_message_timestamp: bool,
    pub scpi_show_message_ip: bool,
    pub scpi_show_message_type: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_discover_ms: 1000,
            timeout_scpi_ms: 2000,
            timeout_screenshot_ms: 15_000,
            com_protocol: ComProtocol::Vxi11,
            raw_port: 5025,
            use_mdns_discovery: false,
            show_sent_scpi: true,
            scpi_show_message_timestamp: true,
            scpi_show_message_ip: false,
            scpi_show_message_type: false,
        }
    }
}

impl Settings {
    pub fn discover_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_discover_ms)
    }

    pub fn scpi_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_scpi_ms)
    }

    pub fn screenshot_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_screenshot_ms)
    }

    pub fn discover_mode(&self) -> DiscoverMode {
        if self.use_mdns_discovery {
            DiscoverMode::Mdns
        } else {
            DiscoverMode::Vxi11Broadcast
        }
    }
}
