//! Sensirion Smart Gadget device.
//!
//! [`SmartGadget`] maps the gadget's characteristics to typed values. Every
//! operation opens its own short session through
//! [`ConnectionSession::with_connection`]; the link is never held between
//! calls.

use tracing::debug;
use uuid::Uuid;

use crate::ble::connection::ConnectionSession;
use crate::ble::platform::BtleplugTransport;
use crate::ble::transport::{GattTransport, PeripheralAddress};
use crate::ble::uuids::{
    BATTERY_LEVEL_UUID, FIRMWARE_REVISION_UUID, MANUFACTURER_NAME_UUID, MODEL_NUMBER_UUID,
    SHT3X_HUMIDITY_NOTIFICATIONS_UUID, SHT3X_TEMPERATURE_NOTIFICATIONS_UUID,
};
use crate::data::decode::{decode_f32_le, decode_i8, decode_utf8};
use crate::data::readings::{DeviceIdentity, SensorReadings};
use crate::error::Result;

/// A Sensirion SHT3x Smart Gadget.
pub struct SmartGadget<T: GattTransport> {
    session: ConnectionSession<T>,
    identity: Option<DeviceIdentity>,
}

impl SmartGadget<BtleplugTransport> {
    /// Create a gadget reached through the system's default Bluetooth adapter.
    pub async fn from_address(address: PeripheralAddress) -> Result<Self> {
        let transport = BtleplugTransport::new().await?;
        Ok(Self::new(ConnectionSession::new(transport, address)))
    }
}

impl<T: GattTransport> SmartGadget<T> {
    /// Create a gadget on top of an existing session.
    pub fn new(session: ConnectionSession<T>) -> Self {
        Self {
            session,
            identity: None,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &ConnectionSession<T> {
        &self.session
    }

    /// Mutable access to the underlying session, e.g. to change the retry budget.
    pub fn session_mut(&mut self) -> &mut ConnectionSession<T> {
        &mut self.session
    }

    /// Check if the identification strings have been read.
    pub fn is_initialized(&self) -> bool {
        self.identity.is_some()
    }

    /// The cached identity, if already read.
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    /// Read manufacturer, model and firmware revision in one session.
    ///
    /// Calling this again re-reads and replaces the stored values.
    pub async fn initialize_identity(&mut self) -> Result<&DeviceIdentity> {
        let identity = self
            .session
            .with_connection(|s| Box::pin(async move { read_identity(s).await }))
            .await?;
        Ok(self.identity.insert(identity))
    }

    async fn cached_identity(&mut self) -> Result<&DeviceIdentity> {
        let identity = match self.identity.take() {
            Some(identity) => identity,
            None => {
                self.session
                    .with_connection(|s| Box::pin(async move { read_identity(s).await }))
                    .await?
            }
        };
        Ok(self.identity.insert(identity))
    }

    /// Manufacturer name, read on first use.
    pub async fn manufacturer(&mut self) -> Result<&str> {
        Ok(&self.cached_identity().await?.manufacturer)
    }

    /// Model number, read on first use.
    pub async fn model(&mut self) -> Result<&str> {
        Ok(&self.cached_identity().await?.model)
    }

    /// Firmware revision, read on first use.
    pub async fn firmware_revision(&mut self) -> Result<&str> {
        Ok(&self.cached_identity().await?.firmware_revision)
    }

    /// Read the temperature in degrees Celsius.
    pub async fn read_temperature(&mut self) -> Result<f32> {
        self.session
            .with_connection(|s| Box::pin(async move { read_temperature(s).await }))
            .await
    }

    /// Read the relative humidity in percent.
    pub async fn read_humidity(&mut self) -> Result<f32> {
        self.session
            .with_connection(|s| Box::pin(async move { read_humidity(s).await }))
            .await
    }

    /// Read the battery level in percent.
    pub async fn read_battery_level(&mut self) -> Result<i8> {
        self.session
            .with_connection(|s| Box::pin(async move { read_battery_level(s).await }))
            .await
    }

    /// Read temperature, humidity and battery level in a single session.
    ///
    /// With `also_init_identity` set and no identity cached yet, the
    /// identification strings are read in the same session first. They are
    /// kept once read, even if a value read fails afterwards. A failed value
    /// read aborts the batch without returning partial readings.
    pub async fn read_all_values(&mut self, also_init_identity: bool) -> Result<SensorReadings> {
        let read_identity_first = also_init_identity && self.identity.is_none();

        let (identity, readings) = self
            .session
            .with_connection(move |s| {
                Box::pin(async move {
                    let identity = if read_identity_first {
                        Some(read_identity(s).await?)
                    } else {
                        None
                    };

                    Ok((identity, read_values(s).await))
                })
            })
            .await?;

        if identity.is_some() {
            self.identity = identity;
        }
        readings
    }
}

impl<T: GattTransport> std::fmt::Debug for SmartGadget<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartGadget")
            .field("address", self.session.address())
            .field("identity", &self.identity)
            .finish()
    }
}

async fn read_string<T: GattTransport>(session: &ConnectionSession<T>, uuid: Uuid) -> Result<String> {
    let raw = session.read_characteristic(uuid).await?;
    decode_utf8(uuid, raw)
}

async fn read_identity<T: GattTransport>(session: &ConnectionSession<T>) -> Result<DeviceIdentity> {
    let manufacturer = read_string(session, MANUFACTURER_NAME_UUID).await?;
    debug!("Manufacturer:  {}", manufacturer);
    let model = read_string(session, MODEL_NUMBER_UUID).await?;
    debug!("Model:         {}", model);
    let firmware_revision = read_string(session, FIRMWARE_REVISION_UUID).await?;
    debug!("Firmware:      {}", firmware_revision);

    Ok(DeviceIdentity {
        manufacturer,
        model,
        firmware_revision,
    })
}

async fn read_temperature<T: GattTransport>(session: &ConnectionSession<T>) -> Result<f32> {
    let uuid = SHT3X_TEMPERATURE_NOTIFICATIONS_UUID;
    let temperature = decode_f32_le(uuid, &session.read_characteristic(uuid).await?)?;
    debug!("Temperature:   {:.2}", temperature);
    Ok(temperature)
}

async fn read_humidity<T: GattTransport>(session: &ConnectionSession<T>) -> Result<f32> {
    let uuid = SHT3X_HUMIDITY_NOTIFICATIONS_UUID;
    let humidity = decode_f32_le(uuid, &session.read_characteristic(uuid).await?)?;
    debug!("Humidity:      {:.2}", humidity);
    Ok(humidity)
}

async fn read_values<T: GattTransport>(session: &ConnectionSession<T>) -> Result<SensorReadings> {
    let temperature = read_temperature(session).await?;
    let humidity = read_humidity(session).await?;
    let battery_level = read_battery_level(session).await?;

    Ok(SensorReadings::new(temperature, humidity, battery_level))
}

async fn read_battery_level<T: GattTransport>(session: &ConnectionSession<T>) -> Result<i8> {
    let battery_level = decode_i8(
        BATTERY_LEVEL_UUID,
        &session.read_characteristic(BATTERY_LEVEL_UUID).await?,
    )?;
    debug!("Battery level: {}", battery_level);
    Ok(battery_level)
}
