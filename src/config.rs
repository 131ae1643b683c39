//! Configuration for sessions and the platform transport.

use std::time::Duration;

/// Settings for a [`ConnectionSession`](crate::ble::ConnectionSession).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Additional attempts after a transient link failure.
    pub retries: u32,
    /// Capacity of the connection event channel.
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Default retry budget.
    pub const DEFAULT_RETRIES: u32 = 2;

    /// Set the retry budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            event_capacity: 16,
        }
    }
}

/// Settings for [`BtleplugTransport`](crate::ble::BtleplugTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportConfig {
    /// How long to scan for a peripheral that the adapter does not know yet.
    pub scan_timeout: Duration,
    /// How often the adapter's peripheral list is checked while scanning.
    pub poll_interval: Duration,
    /// Which of the system's adapters to use.
    pub adapter_index: usize,
}

impl TransportConfig {
    /// Set the scan timeout.
    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    /// Select an adapter by index.
    pub fn with_adapter_index(mut self, adapter_index: usize) -> Self {
        self.adapter_index = adapter_index;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            adapter_index: 0,
        }
    }
}
