//! BLE Service and Characteristic UUIDs.
//!
//! Contains all UUID constants used for Smart Gadget communication.

use uuid::Uuid;

/// The Bluetooth base UUID onto which 16-bit short forms are mapped.
const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_00805f9b34fb;

/// Expand a 16-bit assigned number onto the Bluetooth base UUID.
pub const fn short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

// Generic Attribute Profile
/// Client Characteristic Configuration descriptor UUID.
pub const CLIENT_CHARACTERISTIC_CONFIG_UUID: Uuid = short_uuid(0x2902);

/// CCCD value enabling notifications (little-endian `0x0001`).
pub const NOTIFICATIONS_ON: [u8; 2] = [0x01, 0x00];
/// CCCD value disabling notifications and indications.
pub const NOTIFICATIONS_OFF: [u8; 2] = [0x00, 0x00];

// Device Information Service (Standard BLE)
/// Manufacturer Name characteristic UUID.
pub const MANUFACTURER_NAME_UUID: Uuid = short_uuid(0x2A29);
/// Model Number characteristic UUID.
pub const MODEL_NUMBER_UUID: Uuid = short_uuid(0x2A24);
/// Firmware Revision characteristic UUID.
pub const FIRMWARE_REVISION_UUID: Uuid = short_uuid(0x2A26);

// Battery Service (Standard BLE)
/// Standard BLE Battery Service UUID.
pub const BATTERY_SERVICE_UUID: Uuid = short_uuid(0x180F);
/// Battery Level characteristic UUID (signed byte, percent).
pub const BATTERY_LEVEL_UUID: Uuid = short_uuid(0x2A19);

// SHT3x services (Sensirion Custom)
/// SHT3x Humidity Service UUID.
pub const SHT3X_HUMIDITY_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1234_b38d_4985_720e_0f993a68ee41);
/// SHT3x Humidity Notifications characteristic UUID (Read, Notify; f32 LE).
pub const SHT3X_HUMIDITY_NOTIFICATIONS_UUID: Uuid =
    Uuid::from_u128(0x0000_1235_b38d_4985_720e_0f993a68ee41);
/// SHT3x Temperature Service UUID.
pub const SHT3X_TEMPERATURE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_2234_b38d_4985_720e_0f993a68ee41);
/// SHT3x Temperature Notifications characteristic UUID (Read, Notify; f32 LE).
pub const SHT3X_TEMPERATURE_NOTIFICATIONS_UUID: Uuid =
    Uuid::from_u128(0x0000_2235_b38d_4985_720e_0f993a68ee41);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_uuid_expansion() {
        assert_eq!(
            CLIENT_CHARACTERISTIC_CONFIG_UUID.to_string(),
            "00002902-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            BATTERY_LEVEL_UUID.to_string(),
            "00002a19-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_sht3x_uuids() {
        let temperature = SHT3X_TEMPERATURE_NOTIFICATIONS_UUID.to_string();
        assert_eq!(temperature, "00002235-b38d-4985-720e-0f993a68ee41");
        assert_eq!(
            SHT3X_HUMIDITY_SERVICE_UUID.to_string(),
            "00001234-b38d-4985-720e-0f993a68ee41"
        );
    }

    #[test]
    fn test_notification_values() {
        assert_eq!(u16::from_le_bytes(NOTIFICATIONS_ON), 0x0001);
        assert_eq!(u16::from_le_bytes(NOTIFICATIONS_OFF), 0x0000);
    }
}
