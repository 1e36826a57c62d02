//! Transmitter that sends one 32 byte packet.
//!
//! Runs on the in-memory platform and prints the bus transactions it caused.
//! Run with: cargo run --features mock --example write

use nrf905::mock::MockPlatform;
use nrf905::{Error, Nrf905};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nrf905=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let platform = MockPlatform::new();
    let spi = platform.spi_handle();

    let mut transmitter = Nrf905::new(platform);
    transmitter.open_transmitter()?;
    transmitter.write(&[20; 32])?;
    transmitter.close()?;

    for transaction in spi.transactions() {
        println!(
            "{:#04x} -> {:02x?}",
            transaction.instruction, transaction.written
        );
    }
    Ok(())
}
