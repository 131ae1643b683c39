//! Stream temperature and humidity notifications from a Smart Gadget
//!
//! Run with: cargo run --example watch_notifications -- C4:7C:8D:6A:1F:02

use smartgadget_ble::ble::uuids::{
    SHT3X_HUMIDITY_NOTIFICATIONS_UUID, SHT3X_TEMPERATURE_NOTIFICATIONS_UUID,
};
use smartgadget_ble::data::decode_f32_le;
use smartgadget_ble::{
    BtleplugTransport, ConnectionSession, Error, PeripheralAddress, Result,
};
use std::time::Duration;

const WATCH_DURATION: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let address: PeripheralAddress = std::env::args()
        .nth(1)
        .ok_or_else(|| Error::InvalidAddress {
            value: "<missing>".to_string(),
        })?
        .parse()?;

    println!("Notification Monitor");
    println!("====================\n");

    let transport = BtleplugTransport::new().await?;
    let mut session = ConnectionSession::new(transport, address);

    session.connect().await?;
    println!("Connected to {}. Press Ctrl+C to exit.\n", address);

    let result = watch(&session).await;
    session.disconnect().await;
    result
}

async fn watch(session: &ConnectionSession<BtleplugTransport>) -> Result<()> {
    let temperature = session
        .subscribe(SHT3X_TEMPERATURE_NOTIFICATIONS_UUID)
        .await?;
    session.set_callback(temperature, |data| {
        match decode_f32_le(SHT3X_TEMPERATURE_NOTIFICATIONS_UUID, data) {
            Ok(value) => println!("Temperature: {:.2}°C", value),
            Err(e) => eprintln!("Bad temperature notification: {}", e),
        }
    });

    let humidity = session.subscribe(SHT3X_HUMIDITY_NOTIFICATIONS_UUID).await?;
    session.set_callback(humidity, |data| {
        match decode_f32_le(SHT3X_HUMIDITY_NOTIFICATIONS_UUID, data) {
            Ok(value) => println!("Humidity:    {:.2}%", value),
            Err(e) => eprintln!("Bad humidity notification: {}", e),
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => println!("\nExiting..."),
        _ = tokio::time::sleep(WATCH_DURATION) => println!("\nDone."),
    }

    session.remove_callback(temperature)?;
    session.remove_callback(humidity)?;
    session
        .unsubscribe(SHT3X_TEMPERATURE_NOTIFICATIONS_UUID)
        .await?;
    session.unsubscribe(SHT3X_HUMIDITY_NOTIFICATIONS_UUID).await?;

    Ok(())
}
