//! Transport abstraction over a GATT client stack.
//!
//! A [`ConnectionSession`](crate::ble::ConnectionSession) only needs a
//! handful of primitives from the platform: connect to an address, discover
//! characteristics and descriptors, read and write attribute handles, and
//! receive notifications. Everything else (adapters, pairing, MTU) stays below
//! this seam.

use async_trait::async_trait;
use btleplug::api::{AddressType, BDAddr};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Address of a BLE peripheral together with its address type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralAddress {
    address: BDAddr,
    address_type: AddressType,
}

impl PeripheralAddress {
    /// Create an address with an explicit address type.
    pub fn new(address: BDAddr, address_type: AddressType) -> Self {
        Self {
            address,
            address_type,
        }
    }

    /// Create a random (static or private) address, as used by the Smart Gadget.
    pub fn random(address: BDAddr) -> Self {
        Self::new(address, AddressType::Random)
    }

    /// The 48-bit device address.
    pub fn address(&self) -> BDAddr {
        self.address
    }

    /// The address type used when connecting.
    pub fn address_type(&self) -> AddressType {
        self.address_type
    }
}

impl FromStr for PeripheralAddress {
    type Err = Error;

    /// Parse `"AA:BB:CC:DD:EE:FF"` as a random address.
    fn from_str(s: &str) -> Result<Self> {
        let address = BDAddr::from_str_delim(s.trim()).map_err(|_| Error::InvalidAddress {
            value: s.to_string(),
        })?;
        Ok(Self::random(address))
    }
}

impl fmt::Display for PeripheralAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.address_type {
            AddressType::Random => "random",
            AddressType::Public => "public",
        };
        write!(f, "{} ({})", self.address, kind)
    }
}

/// A characteristic returned by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    /// Attribute handle of the characteristic value.
    pub handle: u16,
    /// Characteristic UUID.
    pub uuid: Uuid,
}

/// A descriptor returned by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorInfo {
    /// Attribute handle of the descriptor.
    pub handle: u16,
    /// Descriptor UUID.
    pub uuid: Uuid,
}

/// Receives notification payloads from an active link.
///
/// Implementations are invoked on whatever task services the link and must
/// not block on further transport calls.
pub trait NotificationReceiver: Send + Sync {
    /// Handle a notification for `handle` carrying `data`.
    fn handle_notification(&self, handle: u16, data: &[u8]);
}

/// Establishes links to peripherals.
#[async_trait]
pub trait GattTransport: Send + Sync {
    /// The link type produced by [`connect`](Self::connect).
    type Link: GattLink;

    /// Connect to `address`, routing all notifications of the new link to `receiver`.
    async fn connect(
        &self,
        address: &PeripheralAddress,
        receiver: Arc<dyn NotificationReceiver>,
    ) -> Result<Self::Link>;
}

/// An established link to one peripheral.
#[async_trait]
pub trait GattLink: Send + Sync {
    /// Find characteristics with the given UUID.
    async fn discover_characteristics(&self, uuid: Uuid) -> Result<Vec<CharacteristicInfo>>;

    /// Find characteristics whose value handle lies in `start..=end`.
    async fn discover_characteristics_in_range(
        &self,
        start: u16,
        end: u16,
    ) -> Result<Vec<CharacteristicInfo>>;

    /// Find descriptors of the characteristic at `characteristic` matching `uuid`.
    async fn discover_descriptors(
        &self,
        characteristic: u16,
        uuid: Uuid,
    ) -> Result<Vec<DescriptorInfo>>;

    /// Read the value at `handle`.
    async fn read(&self, handle: u16) -> Result<Vec<u8>>;

    /// Write `data` to `handle` with response.
    async fn write(&self, handle: u16, data: &[u8]) -> Result<()>;

    /// Tear the link down.
    async fn disconnect(&self) -> Result<()>;
}
