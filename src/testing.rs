//! Test doubles for the transport seam.
//!
//! `MockLink` mocks a synchronous version of [`GattLink`]; the async trait is
//! implemented by delegating to it, which keeps mockall and async-trait apart.
//! `FakeTransport` hands out prepared links, can fail the first connects and
//! delivers notifications to the receiver of the current link.
#![allow(missing_docs)]

use async_trait::async_trait;
use btleplug::api::BDAddr;
use mockall::mock;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::ble::transport::{
    CharacteristicInfo, DescriptorInfo, GattLink, GattTransport, NotificationReceiver,
    PeripheralAddress,
};
use crate::ble::uuids::*;
use crate::error::{Error, Result};

mock! {
    pub Link {
        pub fn sync_discover_characteristics(&self, uuid: Uuid) -> Result<Vec<CharacteristicInfo>>;
        pub fn sync_discover_characteristics_in_range(&self, start: u16, end: u16) -> Result<Vec<CharacteristicInfo>>;
        pub fn sync_discover_descriptors(&self, characteristic: u16, uuid: Uuid) -> Result<Vec<DescriptorInfo>>;
        pub fn sync_read(&self, handle: u16) -> Result<Vec<u8>>;
        pub fn sync_write(&self, handle: u16, data: Vec<u8>) -> Result<()>;
        pub fn sync_disconnect(&self) -> Result<()>;
    }
}

#[async_trait]
impl GattLink for MockLink {
    async fn discover_characteristics(&self, uuid: Uuid) -> Result<Vec<CharacteristicInfo>> {
        self.sync_discover_characteristics(uuid)
    }

    async fn discover_characteristics_in_range(
        &self,
        start: u16,
        end: u16,
    ) -> Result<Vec<CharacteristicInfo>> {
        self.sync_discover_characteristics_in_range(start, end)
    }

    async fn discover_descriptors(
        &self,
        characteristic: u16,
        uuid: Uuid,
    ) -> Result<Vec<DescriptorInfo>> {
        self.sync_discover_descriptors(characteristic, uuid)
    }

    async fn read(&self, handle: u16) -> Result<Vec<u8>> {
        self.sync_read(handle)
    }

    async fn write(&self, handle: u16, data: &[u8]) -> Result<()> {
        self.sync_write(handle, data.to_vec())
    }

    async fn disconnect(&self) -> Result<()> {
        self.sync_disconnect()
    }
}

// Value handles of a Smart Gadget attribute table; notifiable characteristics
// carry their CCCD at `handle + 1`.
pub const MANUFACTURER_HANDLE: u16 = 0x0010;
pub const MODEL_HANDLE: u16 = 0x0012;
pub const FIRMWARE_HANDLE: u16 = 0x0014;
pub const BATTERY_HANDLE: u16 = 0x001b;
pub const HUMIDITY_HANDLE: u16 = 0x0032;
pub const TEMPERATURE_HANDLE: u16 = 0x0037;

const GADGET_TABLE: [(Uuid, u16); 6] = [
    (MANUFACTURER_NAME_UUID, MANUFACTURER_HANDLE),
    (MODEL_NUMBER_UUID, MODEL_HANDLE),
    (FIRMWARE_REVISION_UUID, FIRMWARE_HANDLE),
    (BATTERY_LEVEL_UUID, BATTERY_HANDLE),
    (SHT3X_HUMIDITY_NOTIFICATIONS_UUID, HUMIDITY_HANDLE),
    (SHT3X_TEMPERATURE_NOTIFICATIONS_UUID, TEMPERATURE_HANDLE),
];

pub fn gadget_address() -> PeripheralAddress {
    PeripheralAddress::random(BDAddr::from([0xC4, 0x7C, 0x8D, 0x6A, 0x1F, 0x02]))
}

/// Answer every discovery call from the Smart Gadget table.
pub fn expect_gadget_discovery(link: &mut MockLink) {
    link.expect_sync_discover_characteristics().returning(|uuid| {
        Ok(GADGET_TABLE
            .iter()
            .filter(|(u, _)| *u == uuid)
            .map(|&(uuid, handle)| CharacteristicInfo { handle, uuid })
            .collect())
    });
    link.expect_sync_discover_characteristics_in_range()
        .returning(|start, end| {
            Ok(GADGET_TABLE
                .iter()
                .filter(|(_, h)| (start..=end).contains(h))
                .map(|&(uuid, handle)| CharacteristicInfo { handle, uuid })
                .collect())
        });
    link.expect_sync_discover_descriptors()
        .returning(|characteristic, uuid| {
            let notifiable = characteristic == HUMIDITY_HANDLE || characteristic == TEMPERATURE_HANDLE;
            if notifiable && uuid == CLIENT_CHARACTERISTIC_CONFIG_UUID {
                Ok(vec![DescriptorInfo {
                    handle: characteristic + 1,
                    uuid,
                }])
            } else {
                Ok(Vec::new())
            }
        });
}

/// Values served by [`expect_gadget_reads`].
pub fn gadget_value(handle: u16) -> Result<Vec<u8>> {
    match handle {
        MANUFACTURER_HANDLE => Ok(b"Sensirion AG".to_vec()),
        MODEL_HANDLE => Ok(b"SHT31 Smart Gadget".to_vec()),
        FIRMWARE_HANDLE => Ok(b"1.3".to_vec()),
        BATTERY_HANDLE => Ok(vec![0x57]),
        HUMIDITY_HANDLE => Ok(45.5f32.to_le_bytes().to_vec()),
        TEMPERATURE_HANDLE => Ok(21.25f32.to_le_bytes().to_vec()),
        _ => Err(Error::UnknownHandle { handle }),
    }
}

/// Serve reads from [`gadget_value`], recording every handle read.
pub fn expect_gadget_reads(link: &mut MockLink) -> Arc<Mutex<Vec<u16>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reads = log.clone();
    link.expect_sync_read().returning(move |handle| {
        reads.lock().push(handle);
        gadget_value(handle)
    });
    log
}

/// Expect exactly one disconnect.
pub fn expect_disconnect(link: &mut MockLink) {
    link.expect_sync_disconnect().times(1).returning(|| Ok(()));
}

/// A fully answering gadget link.
pub fn gadget_link() -> (MockLink, Arc<Mutex<Vec<u16>>>) {
    let mut link = MockLink::new();
    expect_gadget_discovery(&mut link);
    let reads = expect_gadget_reads(&mut link);
    expect_disconnect(&mut link);
    (link, reads)
}

/// Transport handing out prepared links in order.
#[derive(Default)]
pub struct FakeTransport {
    links: Mutex<VecDeque<MockLink>>,
    connect_failures: AtomicU32,
    connects: AtomicU32,
    receiver: Mutex<Option<Arc<dyn NotificationReceiver>>>,
}

impl FakeTransport {
    pub fn new(links: impl IntoIterator<Item = MockLink>) -> Self {
        Self {
            links: Mutex::new(links.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Fail the next `failures` connects with a transient error.
    pub fn failing_first(self, failures: u32) -> Self {
        self.connect_failures.store(failures, Ordering::SeqCst);
        self
    }

    /// Number of connect attempts so far.
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Links not yet handed out.
    pub fn pending_links(&self) -> usize {
        self.links.lock().len()
    }

    /// Deliver a notification to the receiver registered by the last connect.
    pub fn deliver(&self, handle: u16, data: &[u8]) {
        let receiver = self.receiver.lock().clone();
        if let Some(receiver) = receiver {
            receiver.handle_notification(handle, data);
        }
    }
}

#[async_trait]
impl GattTransport for FakeTransport {
    type Link = MockLink;

    async fn connect(
        &self,
        _address: &PeripheralAddress,
        receiver: Arc<dyn NotificationReceiver>,
    ) -> Result<MockLink> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::LinkFailure {
                reason: "connection refused".to_string(),
            });
        }

        *self.receiver.lock() = Some(receiver);
        self.links
            .lock()
            .pop_front()
            .ok_or(Error::BluetoothUnavailable)
    }
}
