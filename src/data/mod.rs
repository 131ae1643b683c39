//! Data structures for Smart Gadget values.
//!
//! This module contains the records returned by the device facade and the
//! decoders for raw characteristic payloads.

pub mod decode;
pub mod readings;

pub use decode::{decode_f32_le, decode_i8, decode_utf8};
pub use readings::{DeviceIdentity, SensorReadings};
