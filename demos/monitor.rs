//! Receiver that prints every payload it is handed.
//!
//! Runs on the in-memory platform; a background thread plays the part of a
//! remote transmitter by loading bursts and raising DR.
//! Run with: cargo run --features mock --example monitor

use std::thread;
use std::time::Duration;

use embedded_hal::digital::PinState;
use nrf905::mock::MockPlatform;
use nrf905::{Error, Nrf905, PinAssignment};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nrf905=debug,monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let platform = MockPlatform::new();
    let gpio = platform.gpio_handle();
    let spi = platform.spi_handle();
    let data_ready = PinAssignment::default().data_ready;

    let mut receiver = Nrf905::new(platform);
    receiver.open_receiver(|payload| println!("callback {payload:?}"))?;

    let remote = thread::spawn(move || {
        for message in ["hello", "from", "the other radio"] {
            thread::sleep(Duration::from_millis(200));
            spi.load_rx_payload(message.as_bytes());
            gpio.trigger(data_ready, PinState::High);
            gpio.trigger(data_ready, PinState::Low);
        }
    });
    if remote.join().is_err() {
        info!("transmitter thread panicked");
    }

    let received = receiver.drain_received();
    info!(bytes = received.len(), "queued while listening");
    receiver.close()
}
