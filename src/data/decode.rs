//! Decoding of characteristic payloads.
//!
//! Values are fixed width: a payload whose length differs from the format's
//! size is rejected rather than truncated or padded.

use bytes::Buf;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Size of an IEEE-754 single precision value.
pub const F32_LEN: usize = 4;

/// Size of a signed byte.
pub const I8_LEN: usize = 1;

fn exact(uuid: Uuid, data: &[u8], expected: usize) -> Result<&[u8]> {
    if data.len() == expected {
        Ok(data)
    } else {
        Err(Error::MalformedPayload {
            uuid,
            expected,
            actual: data.len(),
        })
    }
}

/// Decode a little-endian `f32` read from `uuid`.
///
/// ```
/// use smartgadget_ble::data::decode::decode_f32_le;
/// use smartgadget_ble::ble::uuids::SHT3X_TEMPERATURE_NOTIFICATIONS_UUID;
///
/// let value = decode_f32_le(SHT3X_TEMPERATURE_NOTIFICATIONS_UUID, &[0x00, 0x00, 0x80, 0x3f]).unwrap();
/// assert_eq!(value, 1.0);
/// ```
pub fn decode_f32_le(uuid: Uuid, data: &[u8]) -> Result<f32> {
    let mut buf = exact(uuid, data, F32_LEN)?;
    Ok(buf.get_f32_le())
}

/// Decode a signed byte read from `uuid`.
pub fn decode_i8(uuid: Uuid, data: &[u8]) -> Result<i8> {
    let mut buf = exact(uuid, data, I8_LEN)?;
    Ok(buf.get_i8())
}

/// Decode UTF-8 text read from `uuid`.
pub fn decode_utf8(uuid: Uuid, data: Vec<u8>) -> Result<String> {
    String::from_utf8(data).map_err(|e| Error::InvalidData {
        context: format!("Invalid UTF-8 in characteristic {}: {}", uuid, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::*;

    #[test]
    fn test_decode_f32() {
        let uuid = SHT3X_HUMIDITY_NOTIFICATIONS_UUID;
        assert_eq!(decode_f32_le(uuid, &[0x00, 0x00, 0x80, 0x3f]).unwrap(), 1.0);
        assert_eq!(decode_f32_le(uuid, &45.5f32.to_le_bytes()).unwrap(), 45.5);
        assert_eq!(decode_f32_le(uuid, &(-12.75f32).to_le_bytes()).unwrap(), -12.75);
    }

    #[test]
    fn test_decode_f32_wrong_length() {
        let uuid = SHT3X_TEMPERATURE_NOTIFICATIONS_UUID;
        for data in [&[][..], &[0x00, 0x00, 0x80][..], &[0u8; 5][..]] {
            match decode_f32_le(uuid, data) {
                Err(Error::MalformedPayload {
                    uuid: u,
                    expected,
                    actual,
                }) => {
                    assert_eq!(u, uuid);
                    assert_eq!(expected, 4);
                    assert_eq!(actual, data.len());
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_i8() {
        assert_eq!(decode_i8(BATTERY_LEVEL_UUID, &[0x64]).unwrap(), 100);
        assert_eq!(decode_i8(BATTERY_LEVEL_UUID, &[0x9c]).unwrap(), -100);
        assert_eq!(decode_i8(BATTERY_LEVEL_UUID, &[0x00]).unwrap(), 0);
        assert!(matches!(
            decode_i8(BATTERY_LEVEL_UUID, &[0x64, 0x00]),
            Err(Error::MalformedPayload { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(
            decode_utf8(MANUFACTURER_NAME_UUID, b"Sensirion AG".to_vec()).unwrap(),
            "Sensirion AG"
        );
        assert!(matches!(
            decode_utf8(MANUFACTURER_NAME_UUID, vec![0xff, 0xfe]),
            Err(Error::InvalidData { .. })
        ));
    }
}
