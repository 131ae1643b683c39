// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # smartgadget-ble
//!
//! A cross-platform Rust library for reading Sensirion SHT3x Smart Gadgets
//! via Bluetooth Low Energy.
//!
//! ## Features
//!
//! - **Sensor Values**: Temperature, relative humidity and battery level
//! - **Device Identity**: Manufacturer, model and firmware revision
//! - **Short Sessions**: Every operation connects, reads and disconnects
//! - **Handle Caching**: Resolved attribute handles are reused across sessions
//! - **Retries**: Transient link failures are retried with a configurable budget
//! - **Notifications**: Subscribe to characteristics and route payloads by handle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartgadget_ble::{PeripheralAddress, Result, SmartGadget};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let address: PeripheralAddress = "C4:7C:8D:6A:1F:02".parse()?;
//!     let mut gadget = SmartGadget::from_address(address).await?;
//!
//!     let readings = gadget.read_all_values(true).await?;
//!     println!(
//!         "{}: {:.2}°C, {:.1}% RH, battery {}%",
//!         gadget.model().await?,
//!         readings.temperature,
//!         readings.humidity,
//!         readings.battery_level
//!     );
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. CoreBluetooth hides device addresses, so
//! peripherals cannot be looked up by MAC address there.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for configuration and data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod gadget;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use error::{Error, Result};
pub use gadget::SmartGadget;
pub use utils::celsius_to_fahrenheit;

// Re-export commonly used types from submodules
pub use ble::{
    BtleplugTransport, ConnectionEvent, ConnectionSession, ConnectionState, GattLink,
    GattTransport, HandleCache, NotificationReceiver, PeripheralAddress,
};
pub use config::{SessionConfig, TransportConfig};
pub use data::{DeviceIdentity, SensorReadings};
