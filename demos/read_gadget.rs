//! Read all values from a Smart Gadget
//!
//! Run with: cargo run --example read_gadget -- C4:7C:8D:6A:1F:02
//!
//! Change the retry budget:
//!   cargo run --example read_gadget -- C4:7C:8D:6A:1F:02 --retries 5

use smartgadget_ble::{Error, PeripheralAddress, Result, SmartGadget};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,smartgadget_ble=debug".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let address: PeripheralAddress = args
        .first()
        .ok_or_else(|| Error::InvalidAddress {
            value: "<missing>".to_string(),
        })?
        .parse()?;
    let retries = args
        .iter()
        .position(|arg| arg == "--retries")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok());

    println!("Smart Gadget");
    println!("============\n");
    println!("Connecting to {}...\n", address);

    let mut gadget = SmartGadget::from_address(address).await?;
    if let Some(retries) = retries {
        gadget.session_mut().set_retries(retries);
    }

    let readings = gadget.read_all_values(true).await?;

    if let Some(identity) = gadget.identity() {
        println!("Manufacturer: {}", identity.manufacturer);
        println!("Model:        {}", identity.model);
        println!("Firmware:     {}", identity.firmware_revision);
        println!();
    }

    println!(
        "Temperature:  {:.2}°C ({:.2}°F)",
        readings.temperature,
        readings.temperature_fahrenheit()
    );
    println!("Humidity:     {:.2}%", readings.humidity);
    println!("Battery:      {}%", readings.battery_level);
    println!("Read at:      {}", readings.timestamp.to_rfc3339());

    Ok(())
}
