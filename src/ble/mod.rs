//! BLE communication module.
//!
//! This module provides the GATT session layer: the transport seam, the
//! btleplug transport, handle resolution and caching, retries and
//! notification routing.

pub mod connection;
pub mod handles;
pub mod notifications;
pub mod platform;
pub mod retry;
pub mod transport;
pub mod uuids;

pub use connection::{ConnectionEvent, ConnectionSession, ConnectionState};
pub use handles::HandleCache;
pub use notifications::{NotificationCallback, NotificationRouter};
pub use platform::{AttributeTable, BtleplugLink, BtleplugTransport};
pub use retry::with_retries;
pub use transport::{
    CharacteristicInfo, DescriptorInfo, GattLink, GattTransport, NotificationReceiver,
    PeripheralAddress,
};
pub use uuids::*;
