//! BLE connection sessions.
//!
//! A [`ConnectionSession`] owns the link to one peripheral. It resolves
//! characteristic and notification descriptor handles through a shared
//! [`HandleCache`], retries transport operations that fail transiently, and
//! routes notifications to callbacks registered per handle.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::handles::HandleCache;
use crate::ble::notifications::NotificationRouter;
use crate::ble::retry::with_retries;
use crate::ble::transport::{GattLink, GattTransport, NotificationReceiver, PeripheralAddress};
use crate::ble::uuids::{CLIENT_CHARACTERISTIC_CONFIG_UUID, NOTIFICATIONS_OFF, NOTIFICATIONS_ON};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::utils::hex;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No link.
    #[default]
    Disconnected,
    /// Link establishment in progress.
    Connecting,
    /// Link active.
    Connected,
    /// Link teardown in progress.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Event for connection state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// The address of the peripheral.
    pub identifier: String,
    /// The new connection state.
    pub state: ConnectionState,
}

/// A connection session with a single peripheral.
///
/// The session can be connected and disconnected any number of times. Each
/// connect establishes a fresh link; callbacks registered with
/// [`set_callback`](Self::set_callback) live as long as the session.
pub struct ConnectionSession<T: GattTransport> {
    /// Platform transport used to establish links.
    transport: T,
    /// The peripheral this session talks to.
    address: PeripheralAddress,
    /// Retry budget and channel sizes.
    config: SessionConfig,
    /// Resolved handles, shared with other sessions.
    cache: Arc<HandleCache>,
    /// Receiver of the link's notifications.
    router: Arc<NotificationRouter>,
    /// The live link, present only while connected.
    link: Option<T::Link>,
    /// Current connection state.
    state: ConnectionState,
    /// Channel for connection events.
    event_tx: broadcast::Sender<ConnectionEvent>,
    /// Set when a `with_connection` future was dropped while its link was up.
    abandoned_scope: Arc<AtomicBool>,
}

/// Marks a scope as abandoned unless it ran to completion.
struct ScopeGuard {
    abandoned: Arc<AtomicBool>,
    armed: bool,
}

impl ScopeGuard {
    fn new(abandoned: Arc<AtomicBool>) -> Self {
        Self {
            abandoned,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.armed {
            self.abandoned.store(true, Ordering::SeqCst);
        }
    }
}

impl<T: GattTransport> ConnectionSession<T> {
    /// Create a session using the default configuration and the global handle cache.
    pub fn new(transport: T, address: PeripheralAddress) -> Self {
        Self::with_config(transport, address, SessionConfig::default())
    }

    /// Create a session with an explicit configuration.
    pub fn with_config(transport: T, address: PeripheralAddress, config: SessionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            transport,
            address,
            config,
            cache: HandleCache::global(),
            router: Arc::new(NotificationRouter::new()),
            link: None,
            state: ConnectionState::Disconnected,
            event_tx,
            abandoned_scope: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use `cache` instead of the global handle cache.
    pub fn with_cache(mut self, cache: Arc<HandleCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The peripheral address.
    pub fn address(&self) -> &PeripheralAddress {
        &self.address
    }

    /// The retry budget for transport operations.
    pub fn retries(&self) -> u32 {
        self.config.retries
    }

    /// Change the retry budget.
    pub fn set_retries(&mut self, retries: u32) {
        self.config.retries = retries;
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The handle cache used by this session.
    pub fn cache(&self) -> &Arc<HandleCache> {
        &self.cache
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if a link is active.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Subscribe to connection events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Establish a link to the peripheral.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyConnected`] if a link is active, or the last
    /// transport error once the retry budget is spent. A link left behind by
    /// a dropped [`with_connection`](Self::with_connection) future is torn
    /// down first.
    pub async fn connect(&mut self) -> Result<()> {
        if self.abandoned_scope.swap(false, Ordering::SeqCst) {
            warn!(
                "Releasing link to {} left by an abandoned connection scope",
                self.address
            );
            self.disconnect().await;
        }

        if self.link.is_some() {
            return Err(Error::AlreadyConnected);
        }

        self.set_state(ConnectionState::Connecting);
        debug!("Trying to connect to {}", self.address);

        let transport = &self.transport;
        let address = &self.address;
        let receiver: Arc<dyn NotificationReceiver> = self.router.clone();
        let result = with_retries(address, self.config.retries, "connect", || {
            transport.connect(address, receiver.clone())
        })
        .await;

        match result {
            Ok(link) => {
                self.link = Some(link);
                self.set_state(ConnectionState::Connected);
                info!("Connected to {}", self.address);
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Tear down the link, if any.
    ///
    /// Disconnection is best-effort: transport errors are logged and the link
    /// is dropped regardless.
    pub async fn disconnect(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };

        self.set_state(ConnectionState::Disconnecting);

        match link.disconnect().await {
            Ok(()) => info!("Disconnected from {}", self.address),
            Err(e) => warn!("Failed to disconnect from {}: {}", self.address, e),
        }

        self.set_state(ConnectionState::Disconnected);
    }

    /// Run `body` against a freshly connected session.
    ///
    /// The link is torn down after `body` completes, whether it succeeded or
    /// not, and the body's result is returned. If this future is dropped
    /// before the body completes, the link is torn down by the next connect.
    ///
    /// ```rust,no_run
    /// # use smartgadget_ble::ble::{ConnectionSession, GattTransport, uuids::BATTERY_LEVEL_UUID};
    /// # async fn example<T: GattTransport>(session: &mut ConnectionSession<T>) -> smartgadget_ble::Result<()> {
    /// let raw = session
    ///     .with_connection(|s| Box::pin(async move { s.read_characteristic(BATTERY_LEVEL_UUID).await }))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_connection<R, F>(&mut self, body: F) -> Result<R>
    where
        F: for<'s> FnOnce(&'s mut Self) -> BoxFuture<'s, Result<R>>,
    {
        self.connect().await?;

        let mut guard = ScopeGuard::new(self.abandoned_scope.clone());
        let result = body(self).await;
        guard.disarm();

        self.disconnect().await;
        result
    }

    /// Resolve the value handle of the characteristic `uuid`.
    ///
    /// Cached resolutions are returned without touching the transport. If
    /// discovery reports more than one match the first is used.
    pub async fn resolve_characteristic_handle(&self, uuid: Uuid) -> Result<u16> {
        if let Some(handle) = self.cache.characteristic(&uuid) {
            trace!("Characteristic handle cache hit for {}: {:#06x}", uuid, handle);
            return Ok(handle);
        }

        let link = self.link()?;
        let found = self
            .retry("discover characteristic", || link.discover_characteristics(uuid))
            .await?;

        let first = found.first().ok_or_else(|| Error::InvalidHandle {
            uuid,
            reason: format!("No characteristic found for UUID {}", uuid),
        })?;

        if found.len() > 1 {
            warn!(
                "{} characteristics match {}, using handle {:#06x}",
                found.len(),
                uuid,
                first.handle
            );
        }

        debug!("Resolved characteristic {} to handle {:#06x}", uuid, first.handle);
        Ok(self.cache.insert_characteristic(uuid, first.handle))
    }

    /// Resolve the Client Characteristic Configuration descriptor handle of `uuid`.
    pub async fn resolve_notification_handle(&self, uuid: Uuid) -> Result<u16> {
        if let Some(handle) = self.cache.notification(&uuid) {
            trace!("Notification handle cache hit for {}: {:#06x}", uuid, handle);
            return Ok(handle);
        }

        let value_handle = self.resolve_characteristic_handle(uuid).await?;
        let link = self.link()?;

        let characteristics = self
            .retry("discover characteristic range", || {
                link.discover_characteristics_in_range(value_handle, value_handle)
            })
            .await?;
        let characteristic = characteristics.first().ok_or_else(|| Error::InvalidHandle {
            uuid,
            reason: format!("No characteristic found for UUID {}", uuid),
        })?;

        let characteristic_handle = characteristic.handle;
        let descriptors = self
            .retry("discover descriptors", || {
                link.discover_descriptors(characteristic_handle, CLIENT_CHARACTERISTIC_CONFIG_UUID)
            })
            .await?;
        let descriptor = descriptors.first().ok_or_else(|| Error::InvalidHandle {
            uuid,
            reason: format!("No notification descriptor found for UUID {}", uuid),
        })?;

        debug!(
            "Resolved notification descriptor of {} to handle {:#06x}",
            uuid, descriptor.handle
        );
        Ok(self.cache.insert_notification(uuid, descriptor.handle))
    }

    /// Read the raw value of the characteristic `uuid`.
    pub async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let link = self.link()?;
        let handle = self.resolve_characteristic_handle(uuid).await?;

        let data = self
            .retry("read characteristic", || link.read(handle))
            .await?;

        trace!(
            "Read {} bytes from {} ({:#06x}): {}",
            data.len(),
            uuid,
            handle,
            hex(&data)
        );

        Ok(data)
    }

    /// Enable notifications for `uuid`.
    ///
    /// Returns the handle notifications will arrive on, for use with
    /// [`set_callback`](Self::set_callback).
    pub async fn subscribe(&self, uuid: Uuid) -> Result<u16> {
        let handle = self
            .write_notification_config(uuid, &NOTIFICATIONS_ON)
            .await?;
        debug!("Subscribed to notifications from {}", uuid);
        Ok(handle)
    }

    /// Disable notifications for `uuid`.
    pub async fn unsubscribe(&self, uuid: Uuid) -> Result<u16> {
        let handle = self
            .write_notification_config(uuid, &NOTIFICATIONS_OFF)
            .await?;
        debug!("Unsubscribed from notifications from {}", uuid);
        Ok(handle)
    }

    /// Register `callback` for notifications arriving on `handle`.
    ///
    /// A previous callback for the same handle is replaced.
    pub fn set_callback<F>(&self, handle: u16, callback: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.router.set_callback(handle, callback);
    }

    /// Remove the callback for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CallbackNotRegistered`] if no callback is registered.
    pub fn remove_callback(&self, handle: u16) -> Result<()> {
        self.router.remove_callback(handle)
    }

    async fn write_notification_config(&self, uuid: Uuid, value: &[u8]) -> Result<u16> {
        let link = self.link()?;
        let handle = self.resolve_notification_handle(uuid).await?;

        self.retry("write notification descriptor", || link.write(handle, value))
            .await?;

        trace!("Wrote {} to {:#06x}", hex(value), handle);
        Ok(handle)
    }

    fn link(&self) -> Result<&T::Link> {
        self.link.as_ref().ok_or(Error::NotConnected)
    }

    async fn retry<R, F, Fut>(&self, description: &str, operation: F) -> Result<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        with_retries(&self.address, self.config.retries, description, operation).await
    }

    /// Update the connection state and emit an event.
    fn set_state(&mut self, new_state: ConnectionState) {
        let old_state = std::mem::replace(&mut self.state, new_state);

        if old_state != new_state {
            debug!("Connection state changed: {} -> {}", old_state, new_state);

            let _ = self.event_tx.send(ConnectionEvent {
                identifier: self.address.address().to_string(),
                state: new_state,
            });
        }
    }
}

impl<T: GattTransport> Drop for ConnectionSession<T> {
    fn drop(&mut self) {
        if self.link.is_some() {
            warn!(
                "Session for {} dropped while connected; link released without disconnect",
                self.address
            );
        }
    }
}

impl<T: GattTransport> std::fmt::Debug for ConnectionSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("address", &self.address)
            .field("retries", &self.config.retries)
            .field("state", &self.state)
            .field("router", &self.router)
            .finish()
    }
}
