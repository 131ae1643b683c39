//! Cache of resolved attribute handles.
//!
//! Handles are assigned by the peripheral's attribute table and do not change
//! for a given firmware, so a resolution is kept for the lifetime of the
//! cache. Characteristic value handles and notification descriptor handles
//! are cached separately because the CCCD of a characteristic has its own
//! handle.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::trace;
use uuid::Uuid;

/// Shared cache of `UUID -> handle` resolutions.
#[derive(Debug, Default)]
pub struct HandleCache {
    characteristics: Mutex<HashMap<Uuid, u16>>,
    notifications: Mutex<HashMap<Uuid, u16>>,
}

impl HandleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by sessions that were not given their own.
    pub fn global() -> Arc<HandleCache> {
        static GLOBAL: OnceLock<Arc<HandleCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(HandleCache::new())).clone()
    }

    /// Cached characteristic value handle for `uuid`.
    pub fn characteristic(&self, uuid: &Uuid) -> Option<u16> {
        self.characteristics.lock().get(uuid).copied()
    }

    /// Cached notification descriptor handle for `uuid`.
    pub fn notification(&self, uuid: &Uuid) -> Option<u16> {
        self.notifications.lock().get(uuid).copied()
    }

    /// Record a characteristic handle, returning the handle now cached.
    ///
    /// An existing entry wins over the new one.
    pub fn insert_characteristic(&self, uuid: Uuid, handle: u16) -> u16 {
        let cached = *self.characteristics.lock().entry(uuid).or_insert(handle);
        trace!("Cached characteristic handle {:#06x} for {}", cached, uuid);
        cached
    }

    /// Record a notification descriptor handle, returning the handle now cached.
    ///
    /// An existing entry wins over the new one.
    pub fn insert_notification(&self, uuid: Uuid, handle: u16) -> u16 {
        let cached = *self.notifications.lock().entry(uuid).or_insert(handle);
        trace!("Cached notification handle {:#06x} for {}", cached, uuid);
        cached
    }

    /// Number of cached characteristic and notification handles.
    pub fn len(&self) -> (usize, usize) {
        (
            self.characteristics.lock().len(),
            self.notifications.lock().len(),
        )
    }

    /// Check if both maps are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == (0, 0)
    }

    /// Forget every resolution, e.g. before talking to a different firmware.
    pub fn clear(&self) {
        self.characteristics.lock().clear();
        self.notifications.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::*;

    #[test]
    fn test_insert_and_lookup() {
        let cache = HandleCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.characteristic(&BATTERY_LEVEL_UUID), None);

        assert_eq!(cache.insert_characteristic(BATTERY_LEVEL_UUID, 0x1b), 0x1b);
        assert_eq!(cache.characteristic(&BATTERY_LEVEL_UUID), Some(0x1b));
        assert_eq!(cache.notification(&BATTERY_LEVEL_UUID), None);
        assert_eq!(cache.len(), (1, 0));
    }

    #[test]
    fn test_first_insert_wins() {
        let cache = HandleCache::new();
        cache.insert_notification(SHT3X_TEMPERATURE_NOTIFICATIONS_UUID, 0x24);
        let cached = cache.insert_notification(SHT3X_TEMPERATURE_NOTIFICATIONS_UUID, 0x99);
        assert_eq!(cached, 0x24);
        assert_eq!(
            cache.notification(&SHT3X_TEMPERATURE_NOTIFICATIONS_UUID),
            Some(0x24)
        );
    }

    #[test]
    fn test_clear() {
        let cache = HandleCache::new();
        cache.insert_characteristic(MODEL_NUMBER_UUID, 0x10);
        cache.insert_notification(MODEL_NUMBER_UUID, 0x11);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        let a = HandleCache::global();
        let b = HandleCache::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
