//! Utility functions for the smartgadget-ble crate.

use std::fmt::Write;

/// Render bytes as lowercase hex, e.g. for logging raw payloads.
///
/// # Example
///
/// ```
/// use smartgadget_ble::utils::hex;
///
/// assert_eq!(hex(&[0x00, 0x00, 0x80, 0x3f]), "0000803f");
/// ```
pub fn hex(data: &[u8]) -> String {
    data.iter().fold(String::with_capacity(data.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

/// Convert Celsius to Fahrenheit.
///
/// ```
/// use smartgadget_ble::celsius_to_fahrenheit;
///
/// assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[]), "");
        assert_eq!(hex(&[0x01, 0xab, 0xff]), "01abff");
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(-40.0) - (-40.0)).abs() < 0.001);
        assert!((celsius_to_fahrenheit(21.5) - 70.7).abs() < 0.001);
    }
}
