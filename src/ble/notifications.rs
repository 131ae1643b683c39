//! Routing of notification payloads to per-handle callbacks.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::ble::transport::NotificationReceiver;
use crate::error::{Error, Result};
use crate::utils::hex;

/// Callback invoked with the payload of a notification.
pub type NotificationCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Dispatches notifications by attribute handle.
///
/// One callback per handle; registering again replaces the previous one.
#[derive(Default)]
pub struct NotificationRouter {
    callbacks: RwLock<HashMap<u16, NotificationCallback>>,
}

impl NotificationRouter {
    /// Create a router with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `handle`, replacing any previous one.
    pub fn set_callback<F>(&self, handle: u16, callback: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let replaced = self
            .callbacks
            .write()
            .insert(handle, Arc::new(callback))
            .is_some();
        debug!(
            "Registered notification callback for handle {:#06x} (replaced: {})",
            handle, replaced
        );
    }

    /// Remove the callback for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallbackNotRegistered`] if nothing is registered.
    pub fn remove_callback(&self, handle: u16) -> Result<()> {
        self.callbacks
            .write()
            .remove(&handle)
            .map(|_| debug!("Removed notification callback for handle {:#06x}", handle))
            .ok_or(Error::CallbackNotRegistered { handle })
    }

    /// Check if a callback is registered for `handle`.
    pub fn has_callback(&self, handle: u16) -> bool {
        self.callbacks.read().contains_key(&handle)
    }
}

impl NotificationReceiver for NotificationRouter {
    fn handle_notification(&self, handle: u16, data: &[u8]) {
        debug!("Got notification from {:#06x}: {}", handle, hex(data));

        // Release the lock before calling out so callbacks may re-register.
        let callback = self.callbacks.read().get(&handle).cloned();
        match callback {
            Some(callback) => callback(data),
            None => trace!("No callback for handle {:#06x}, dropping", handle),
        }
    }
}

impl std::fmt::Debug for NotificationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handles: Vec<_> = self.callbacks.read().keys().copied().collect();
        handles.sort_unstable();
        f.debug_struct("NotificationRouter")
            .field("handles", &handles)
            .finish()
    }
}
