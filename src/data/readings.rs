//! Sensor reading and device identity records.

use chrono::{DateTime, Utc};

use crate::utils::celsius_to_fahrenheit;

/// One batch of sensor values read in a single session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorReadings {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// Battery level in percent.
    ///
    /// The characteristic is a signed byte; only 0-100 is meaningful.
    pub battery_level: i8,
    /// When the batch was read.
    pub timestamp: DateTime<Utc>,
}

impl SensorReadings {
    /// Create a record stamped with the current time.
    pub fn new(temperature: f32, humidity: f32, battery_level: i8) -> Self {
        Self {
            temperature,
            humidity,
            battery_level,
            timestamp: Utc::now(),
        }
    }

    /// Temperature in degrees Fahrenheit.
    pub fn temperature_fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature)
    }
}

/// Identification strings from the Device Information Service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceIdentity {
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model number.
    pub model: String,
    /// Firmware revision.
    pub firmware_revision: String,
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} (firmware {})",
            self.manufacturer, self.model, self.firmware_revision
        )
    }
}
