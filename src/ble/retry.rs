//! Retry policy for transport operations.

use std::future::Future;
use tracing::debug;

use crate::ble::transport::PeripheralAddress;
use crate::error::Result;

/// Run `operation`, retrying it immediately up to `retries` more times while it
/// fails with a transient error.
///
/// The error of the last attempt is returned unchanged. Permanent errors are
/// returned after the first attempt.
pub async fn with_retries<T, F, Fut>(
    address: &PeripheralAddress,
    retries: u32,
    description: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt <= retries => {
                debug!(
                    "Unable to {} on {} (attempt {} of {}): {}. Retrying.",
                    description,
                    address,
                    attempt,
                    retries.saturating_add(1),
                    e
                );
            }
            Err(e) => {
                debug!(
                    "Giving up to {} on {} after {} attempt(s): {}",
                    description, address, attempt, e
                );
                return Err(e);
            }
        }
    }
}
