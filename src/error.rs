//! Error types for the smartgadget-ble crate.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// The radio link failed in a way that may succeed on another attempt.
    #[error("Link failure: {reason}")]
    LinkFailure {
        /// Description of the failure reported by the transport.
        reason: String,
    },

    /// No peripheral with the requested address could be found.
    #[error("Device not found: {address}")]
    DeviceNotFound {
        /// The address that was searched for.
        address: String,
    },

    /// A UUID could not be resolved to a handle on this device.
    #[error("Invalid handle for {uuid}: {reason}")]
    InvalidHandle {
        /// The characteristic UUID that failed to resolve.
        uuid: Uuid,
        /// Why resolution failed.
        reason: String,
    },

    /// The transport was asked to operate on a handle it does not know.
    #[error("Unknown attribute handle {handle:#06x}")]
    UnknownHandle {
        /// The handle that was requested.
        handle: u16,
    },

    /// A fixed-width value was read from a buffer of the wrong size.
    #[error("Malformed payload from {uuid}: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        /// The characteristic the payload was read from.
        uuid: Uuid,
        /// The number of bytes the format requires.
        expected: usize,
        /// The number of bytes received.
        actual: usize,
    },

    /// Invalid data was received from the device.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// Operation requires an active link but the session is not connected.
    #[error("Session not connected")]
    NotConnected,

    /// A link is already active on this session.
    #[error("Session already connected")]
    AlreadyConnected,

    /// No notification callback is registered for the handle.
    #[error("No callback registered for handle {handle:#06x}")]
    CallbackNotRegistered {
        /// The handle that was looked up.
        handle: u16,
    },

    /// A peripheral address string could not be parsed.
    #[error("Invalid peripheral address: {value}")]
    InvalidAddress {
        /// The rejected input.
        value: String,
    },
}

impl Error {
    /// Whether the failure is a transient link condition worth retrying.
    ///
    /// Resolution, decoding and precondition errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Bluetooth(e) => matches!(
                e,
                btleplug::Error::DeviceNotFound
                    | btleplug::Error::NotConnected
                    | btleplug::Error::TimedOut(_)
                    | btleplug::Error::RuntimeError(_)
                    | btleplug::Error::Other(_)
            ),
            Self::LinkFailure { .. } | Self::DeviceNotFound { .. } => true,
            _ => false,
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_classification() {
        assert!(Error::LinkFailure {
            reason: "timeout".to_string()
        }
        .is_transient());
        assert!(Error::DeviceNotFound {
            address: "C4:7C:8D:00:00:01".to_string()
        }
        .is_transient());
        assert!(Error::Bluetooth(btleplug::Error::TimedOut(Duration::from_secs(1))).is_transient());
        assert!(Error::Bluetooth(btleplug::Error::NotConnected).is_transient());

        assert!(!Error::Bluetooth(btleplug::Error::PermissionDenied).is_transient());
        assert!(!Error::NotConnected.is_transient());
        assert!(!Error::InvalidHandle {
            uuid: Uuid::nil(),
            reason: "missing".to_string()
        }
        .is_transient());
        assert!(!Error::MalformedPayload {
            uuid: Uuid::nil(),
            expected: 4,
            actual: 2
        }
        .is_transient());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::MalformedPayload {
            uuid: Uuid::nil(),
            expected: 4,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 4"));
        assert!(msg.contains("got 3"));

        let err = Error::UnknownHandle { handle: 0x2b };
        assert_eq!(err.to_string(), "Unknown attribute handle 0x002b");
    }
}
