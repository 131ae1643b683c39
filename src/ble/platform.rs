//! btleplug implementation of the transport seam.
//!
//! btleplug addresses characteristics and descriptors by UUID and never
//! exposes ATT handles. [`AttributeTable`] numbers the discovered services
//! the way a GATT server lays out its database (service declaration,
//! characteristic declaration, value, descriptors) so the session can keep
//! working with plain `u16` handles.
//!
//! Notifications are reported under the handle of the characteristic's
//! Client Characteristic Configuration descriptor, which is the handle
//! [`ConnectionSession::subscribe`](crate::ble::ConnectionSession::subscribe)
//! returns. Characteristics without one report under their value handle.

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, Characteristic, Descriptor, Manager as _, Peripheral as _, ScanFilter,
    Service, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::transport::{
    CharacteristicInfo, DescriptorInfo, GattLink, GattTransport, NotificationReceiver,
    PeripheralAddress,
};
use crate::ble::uuids::{CLIENT_CHARACTERISTIC_CONFIG_UUID, NOTIFICATIONS_OFF, NOTIFICATIONS_ON};
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::utils::hex;

/// An entry of an [`AttributeTable`].
#[derive(Debug, Clone)]
pub enum Attribute {
    /// A characteristic value.
    Value(Characteristic),
    /// A characteristic descriptor.
    Descriptor {
        /// The descriptor itself.
        descriptor: Descriptor,
        /// The characteristic the descriptor belongs to.
        characteristic: Characteristic,
        /// Value handle of that characteristic.
        value_handle: u16,
    },
}

/// Synthetic ATT handles for a discovered set of services.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    attributes: BTreeMap<u16, Attribute>,
}

impl AttributeTable {
    /// Number the attributes of `services` starting at handle 1.
    pub fn from_services(services: impl IntoIterator<Item = Service>) -> Self {
        let mut attributes = BTreeMap::new();
        let mut next: u16 = 1;
        let mut allocate = || {
            let handle = next;
            next = next.saturating_add(1);
            handle
        };

        for service in services {
            // Service declaration.
            allocate();

            for characteristic in service.characteristics {
                // Characteristic declaration.
                allocate();
                let value_handle = allocate();

                for descriptor in &characteristic.descriptors {
                    attributes.insert(
                        allocate(),
                        Attribute::Descriptor {
                            descriptor: descriptor.clone(),
                            characteristic: characteristic.clone(),
                            value_handle,
                        },
                    );
                }

                attributes.insert(value_handle, Attribute::Value(characteristic));
            }
        }

        Self { attributes }
    }

    /// Number of value and descriptor attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Look up the attribute at `handle`.
    pub fn get(&self, handle: u16) -> Option<&Attribute> {
        self.attributes.get(&handle)
    }

    fn values(&self) -> impl Iterator<Item = (u16, &Characteristic)> {
        self.attributes.iter().filter_map(|(&handle, attribute)| match attribute {
            Attribute::Value(characteristic) => Some((handle, characteristic)),
            Attribute::Descriptor { .. } => None,
        })
    }

    /// Characteristics with the given UUID, in handle order.
    pub fn characteristics_by_uuid(&self, uuid: Uuid) -> Vec<CharacteristicInfo> {
        self.values()
            .filter(|(_, c)| c.uuid == uuid)
            .map(|(handle, c)| CharacteristicInfo { handle, uuid: c.uuid })
            .collect()
    }

    /// Characteristics whose value handle lies in `start..=end`.
    pub fn characteristics_in_range(&self, start: u16, end: u16) -> Vec<CharacteristicInfo> {
        self.values()
            .filter(|(handle, _)| (start..=end).contains(handle))
            .map(|(handle, c)| CharacteristicInfo { handle, uuid: c.uuid })
            .collect()
    }

    /// Descriptors with the given UUID belonging to the characteristic at `value_handle`.
    pub fn descriptors(&self, value_handle: u16, uuid: Uuid) -> Vec<DescriptorInfo> {
        self.attributes
            .iter()
            .filter_map(|(&handle, attribute)| match attribute {
                Attribute::Descriptor {
                    descriptor,
                    value_handle: parent,
                    ..
                } if *parent == value_handle && descriptor.uuid == uuid => Some(DescriptorInfo {
                    handle,
                    uuid: descriptor.uuid,
                }),
                _ => None,
            })
            .collect()
    }

    /// Handle each characteristic's notifications are reported under.
    fn notification_handles(&self) -> HashMap<Uuid, u16> {
        let mut handles = HashMap::new();
        for (value_handle, characteristic) in self.values() {
            let handle = self
                .descriptors(value_handle, CLIENT_CHARACTERISTIC_CONFIG_UUID)
                .first()
                .map_or(value_handle, |d| d.handle);
            handles.entry(characteristic.uuid).or_insert(handle);
        }
        handles
    }
}

/// Transport over the platform Bluetooth stack.
pub struct BtleplugTransport {
    adapter: Adapter,
    config: TransportConfig,
}

impl BtleplugTransport {
    /// Create a transport on the default adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default()).await
    }

    /// Create a transport on the adapter selected by `config`.
    pub async fn with_config(config: TransportConfig) -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await?;

        let adapter = adapters
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter, config))
    }

    /// Create a transport on a specific adapter.
    pub fn with_adapter(adapter: Adapter, config: TransportConfig) -> Self {
        Self { adapter, config }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// The transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn known_peripheral(&self, address: BDAddr) -> Result<Option<Peripheral>> {
        let peripherals = self.adapter.peripherals().await?;
        Ok(peripherals.into_iter().find(|p| p.address() == address))
    }

    /// Find the peripheral with `address`, scanning for it if needed.
    async fn find_peripheral(&self, address: BDAddr) -> Result<Peripheral> {
        if let Some(peripheral) = self.known_peripheral(address).await? {
            return Ok(peripheral);
        }

        debug!("{} not known yet, scanning for {:?}", address, self.config.scan_timeout);
        self.adapter.start_scan(ScanFilter::default()).await?;

        let poll_interval = self.config.poll_interval;
        let found = tokio::time::timeout(self.config.scan_timeout, async {
            loop {
                if let Some(peripheral) = self.known_peripheral(address).await? {
                    return Ok::<_, Error>(peripheral);
                }
                tokio::time::sleep(poll_interval).await;
            }
        })
        .await;

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        match found {
            Ok(result) => result,
            Err(_) => Err(Error::DeviceNotFound {
                address: address.to_string(),
            }),
        }
    }
}

#[async_trait]
impl GattTransport for BtleplugTransport {
    type Link = BtleplugLink;

    async fn connect(
        &self,
        address: &PeripheralAddress,
        receiver: Arc<dyn NotificationReceiver>,
    ) -> Result<BtleplugLink> {
        let peripheral = self.find_peripheral(address.address()).await?;

        // The platform stack resolves the address type on its own.
        trace!("Connecting to {}", address);
        peripheral.connect().await?;

        match BtleplugLink::establish(peripheral.clone(), receiver).await {
            Ok(link) => Ok(link),
            Err(e) => {
                if let Err(disconnect_error) = peripheral.disconnect().await {
                    warn!(
                        "Failed to disconnect from {} after setup error: {}",
                        address, disconnect_error
                    );
                }
                Err(e)
            }
        }
    }
}

/// A connected btleplug peripheral.
pub struct BtleplugLink {
    peripheral: Peripheral,
    table: AttributeTable,
    listener: JoinHandle<()>,
}

impl BtleplugLink {
    async fn establish(
        peripheral: Peripheral,
        receiver: Arc<dyn NotificationReceiver>,
    ) -> Result<Self> {
        peripheral.discover_services().await?;

        let table = AttributeTable::from_services(peripheral.services());
        debug!("Discovered {} attributes", table.len());

        let handles = table.notification_handles();
        let mut notifications = peripheral.notifications().await?;

        let listener = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                match handles.get(&notification.uuid) {
                    Some(&handle) => receiver.handle_notification(handle, &notification.value),
                    None => trace!(
                        "Notification from unknown characteristic {}: {}",
                        notification.uuid,
                        hex(&notification.value)
                    ),
                }
            }

            debug!("Notification listener stopped");
        });

        Ok(Self {
            peripheral,
            table,
            listener,
        })
    }

    fn attribute(&self, handle: u16) -> Result<&Attribute> {
        self.table.get(handle).ok_or(Error::UnknownHandle { handle })
    }
}

#[async_trait]
impl GattLink for BtleplugLink {
    async fn discover_characteristics(&self, uuid: Uuid) -> Result<Vec<CharacteristicInfo>> {
        Ok(self.table.characteristics_by_uuid(uuid))
    }

    async fn discover_characteristics_in_range(
        &self,
        start: u16,
        end: u16,
    ) -> Result<Vec<CharacteristicInfo>> {
        Ok(self.table.characteristics_in_range(start, end))
    }

    async fn discover_descriptors(
        &self,
        characteristic: u16,
        uuid: Uuid,
    ) -> Result<Vec<DescriptorInfo>> {
        Ok(self.table.descriptors(characteristic, uuid))
    }

    async fn read(&self, handle: u16) -> Result<Vec<u8>> {
        let data = match self.attribute(handle)? {
            Attribute::Value(characteristic) => self.peripheral.read(characteristic).await?,
            Attribute::Descriptor { descriptor, .. } => {
                self.peripheral.read_descriptor(descriptor).await?
            }
        };
        Ok(data)
    }

    async fn write(&self, handle: u16, data: &[u8]) -> Result<()> {
        match self.attribute(handle)? {
            Attribute::Value(characteristic) => {
                self.peripheral
                    .write(characteristic, data, WriteType::WithResponse)
                    .await?
            }
            // btleplug owns the CCCD; notifications are toggled through subscribe.
            Attribute::Descriptor {
                descriptor,
                characteristic,
                ..
            } if descriptor.uuid == CLIENT_CHARACTERISTIC_CONFIG_UUID => {
                if data == NOTIFICATIONS_ON {
                    self.peripheral.subscribe(characteristic).await?
                } else if data == NOTIFICATIONS_OFF {
                    self.peripheral.unsubscribe(characteristic).await?
                } else {
                    self.peripheral.write_descriptor(descriptor, data).await?
                }
            }
            Attribute::Descriptor { descriptor, .. } => {
                self.peripheral.write_descriptor(descriptor, data).await?
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.listener.abort();
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl Drop for BtleplugLink {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
