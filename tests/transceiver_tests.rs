//! Device Controller Tests
//!
//! Session state machine, setters, chunked writes and the receive queue under
//! concurrent notification and drain.
//! Run with: cargo test --features mock --test transceiver_tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embedded_hal::digital::PinState;
use nrf905::commands::{W_CONFIG, W_TX_ADDRESS, W_TX_PAYLOAD};
use nrf905::mock::{MockGpio, MockPlatform, MockSpi};
use nrf905::{
    encode_configuration, Address, CrcMode, DriverConfig, Error, Nrf905, PinAssignment, PinMode,
    QueueBound, Role, SpiBus, StateError, ValidationError,
};
use proptest::prelude::*;

struct Rig {
    radio: Nrf905<MockPlatform>,
    gpio: MockGpio,
    spi: MockSpi,
}

fn rig() -> Rig {
    let platform = MockPlatform::new();
    let gpio = platform.gpio_handle();
    let spi = platform.spi_handle();
    Rig {
        radio: Nrf905::new(platform),
        gpio,
        spi,
    }
}

fn data_ready() -> nrf905::Pin {
    PinAssignment::default().data_ready
}

#[test]
fn test_open_transmitter_brings_up_device() {
    let mut rig = rig();
    rig.radio.set_address(0xDDCC_BBAA_u32).unwrap();

    rig.radio.open_transmitter().unwrap();

    assert!(rig.radio.is_open());
    assert_eq!(rig.radio.role(), Some(Role::Transmitter));
    let expected =
        encode_configuration(433.2, Address::new(0xDDCC_BBAA), CrcMode::Crc16).unwrap();
    assert_eq!(rig.spi.transactions_with(W_CONFIG)[0].written, expected.to_vec());
    assert_eq!(rig.spi.tx_address(), [0xAA, 0xBB, 0xCC, 0xDD]);
    assert!(!rig.gpio.is_watched(data_ready()));
    assert!(rig.radio.status().is_some());
}

#[test]
fn test_open_receiver_arms_data_ready() {
    let mut rig = rig();

    rig.radio.open_receiver(|_| {}).unwrap();

    assert_eq!(rig.radio.role(), Some(Role::Receiver));
    assert!(rig.gpio.is_watched(data_ready()));
    assert!(rig.spi.transactions_with(W_TX_ADDRESS).is_empty());
}

#[test]
fn test_open_same_role_is_noop() {
    let mut rig = rig();
    rig.radio.open(None).unwrap();
    let before = rig.spi.transactions().len();

    rig.radio.open(None).unwrap();

    assert_eq!(rig.spi.transactions().len(), before);
    assert_eq!(rig.radio.role(), Some(Role::Transmitter));

    let mut rig = self::rig();
    rig.radio.open_receiver(|_| {}).unwrap();
    rig.radio.open_receiver(|_| {}).unwrap();
    assert_eq!(rig.radio.role(), Some(Role::Receiver));
}

#[test]
fn test_open_opposite_role_conflicts() {
    let mut rig = rig();
    rig.radio.open_transmitter().unwrap();
    assert!(matches!(
        rig.radio.open_receiver(|_| {}),
        Err(Error::State(StateError::RoleConflict {
            open: Role::Transmitter,
            requested: Role::Receiver
        }))
    ));

    let mut rig = self::rig();
    rig.radio.open_receiver(|_| {}).unwrap();
    assert!(matches!(
        rig.radio.open_transmitter(),
        Err(Error::State(StateError::RoleConflict {
            open: Role::Receiver,
            requested: Role::Transmitter
        }))
    ));
    assert_eq!(rig.radio.role(), Some(Role::Receiver));
}

#[test]
fn test_open_unresolved_frequency_touches_nothing() {
    let mut rig = rig();
    rig.radio.set_frequency(512.7).unwrap();

    assert!(matches!(
        rig.radio.open_transmitter(),
        Err(Error::Validation(ValidationError::UnresolvedFrequency(_)))
    ));
    assert!(!rig.radio.is_open());
    assert!(rig.spi.transactions().is_empty());
    assert!(rig.gpio.writes().is_empty());
}

#[test]
fn test_open_unreachable_hardware() {
    let mut radio = Nrf905::new(MockPlatform::disconnected());

    assert!(matches!(
        radio.open_transmitter(),
        Err(Error::HardwareUnavailable(_))
    ));
    assert!(!radio.is_open());
    // A failed open can be retried after fixing the cause
    assert!(radio.set_spi_bus(1u8).is_ok());
}

#[test]
fn test_open_failure_releases_hardware() {
    let mut rig = rig();
    rig.spi.set_failing(true);

    assert!(matches!(rig.radio.open_transmitter(), Err(Error::Bus(_))));
    assert!(!rig.radio.is_open());
    assert_eq!(rig.spi.open_bus(), None);
    assert_eq!(rig.spi.close_count(), 1);
}

#[test]
fn test_write_before_open() {
    let mut rig = rig();
    assert!(matches!(
        rig.radio.write(b"hello"),
        Err(Error::State(StateError::NotOpen))
    ));
}

#[test]
fn test_write_in_receive_mode() {
    let mut rig = rig();
    rig.radio.open_receiver(|_| {}).unwrap();
    assert!(matches!(
        rig.radio.write(b"hello"),
        Err(Error::State(StateError::ReceiveMode))
    ));
    assert!(rig.spi.transactions_with(W_TX_PAYLOAD).is_empty());
}

#[test]
fn test_write_one_transaction_per_burst() {
    let mut rig = rig();
    rig.radio.open_transmitter().unwrap();

    for (len, bursts) in [(1usize, 1usize), (32, 1), (33, 2), (64, 2), (100, 4)] {
        rig.spi.clear_transactions();
        let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();

        rig.radio.write(&payload).unwrap();

        let writes = rig.spi.transactions_with(W_TX_PAYLOAD);
        assert_eq!(writes.len(), bursts, "{len} bytes");
        let sent: Vec<u8> = writes.iter().flat_map(|t| t.written.clone()).collect();
        assert_eq!(&sent[..len], &payload[..]);
    }
}

#[test]
fn test_setters_before_open() {
    let mut rig = rig();

    rig.radio
        .set_pins(PinAssignment::from_numbers([2, 3, 4, 5, 6, 7]).unwrap())
        .unwrap();
    rig.radio.set_spi_bus(1i64).unwrap();
    rig.radio.set_address(0x1234_5678_u32).unwrap();
    rig.radio.set_crc_mode(8i64).unwrap();
    rig.radio.set_frequency(868.2).unwrap();

    let config = rig.radio.config();
    assert_eq!(config.spi_bus, SpiBus::Bus1);
    assert_eq!(config.address, Address::new(0x1234_5678));
    assert_eq!(config.crc, CrcMode::Crc8);
    assert_eq!(config.frequency_mhz, 868.2);
    assert_eq!(config.pins.power_up.number(), 2);

    rig.radio.open_transmitter().unwrap();
    assert_eq!(rig.spi.open_bus().map(|(bus, _)| bus), Some(SpiBus::Bus1));
}

#[test]
fn test_setters_take_plain_literals() {
    let mut rig = rig();

    rig.radio.set_spi_bus(1).unwrap();
    rig.radio.set_crc_mode(8).unwrap();
    rig.radio.set_address(5).unwrap();

    let config = rig.radio.config();
    assert_eq!(config.spi_bus, SpiBus::Bus1);
    assert_eq!(config.crc, CrcMode::Crc8);
    assert_eq!(config.address, Address::new(5));

    assert!(matches!(
        rig.radio.set_spi_bus(2),
        Err(Error::Validation(ValidationError::BusOutOfRange(2)))
    ));
    assert!(matches!(
        rig.radio.set_crc_mode(12),
        Err(Error::Validation(ValidationError::CrcWidth(12)))
    ));
    assert!(matches!(
        rig.radio.set_address(-1),
        Err(Error::Validation(ValidationError::AddressOutOfRange(-1)))
    ));
}

#[test]
fn test_setters_fail_while_open() {
    let mut rig = rig();
    rig.radio.open_transmitter().unwrap();

    let results = [
        rig.radio.set_pins(PinAssignment::default()),
        rig.radio.set_spi_bus(0i64),
        rig.radio.set_address(1u32),
        rig.radio.set_crc_mode(16i64),
        rig.radio.set_frequency(433.2),
    ];
    for result in results {
        assert!(matches!(
            result,
            Err(Error::State(StateError::DeviceInUse { .. }))
        ));
    }

    rig.radio.close().unwrap();
    assert!(rig.radio.set_frequency(868.2).is_ok());
}

#[test]
fn test_set_spi_bus_range() {
    let mut rig = rig();
    for bus in [-1i64, 2, 255] {
        assert!(matches!(
            rig.radio.set_spi_bus(bus),
            Err(Error::Validation(ValidationError::BusOutOfRange(b))) if b == bus
        ));
    }
}

#[test]
fn test_set_pins_rejects_duplicates() {
    let mut rig = rig();
    let mut pins = PinAssignment::default();
    pins.carrier_detect = pins.data_ready;

    assert!(matches!(
        rig.radio.set_pins(pins),
        Err(Error::Validation(ValidationError::DuplicatePin(18)))
    ));
}

#[test]
fn test_set_address_bounds() {
    let mut rig = rig();

    rig.radio.set_address(0u32).unwrap();
    rig.radio.set_address(0xFFFF_FFFF_u32).unwrap();
    rig.radio.set_address(0i64).unwrap();
    rig.radio.set_address(0xFFFF_FFFF_i64).unwrap();
    rig.radio.set_address(4_294_967_295.0_f64).unwrap();
    assert_eq!(rig.radio.config().address, Address::new(0xFFFF_FFFF));

    assert!(matches!(
        rig.radio.set_address(-1i64),
        Err(Error::Validation(ValidationError::AddressOutOfRange(-1)))
    ));
    assert!(matches!(
        rig.radio.set_address(0x1_0000_0000_i64),
        Err(Error::Validation(ValidationError::AddressOutOfRange(_)))
    ));
    assert!(matches!(
        rig.radio.set_address(1.5_f64),
        Err(Error::Validation(ValidationError::AddressNotIntegral(_)))
    ));
    assert!(matches!(
        rig.radio.set_address(-3.0_f64),
        Err(Error::Validation(_))
    ));
    assert_eq!(rig.radio.config().address, Address::new(0xFFFF_FFFF));
}

proptest! {
    #[test]
    fn crc_mode_accepts_only_defined_widths(width in -1000i64..1000) {
        let mut rig = rig();
        let result = rig.radio.set_crc_mode(width);
        if matches!(width, 0 | 8 | 16) {
            prop_assert!(result.is_ok());
        } else {
            let rejected = matches!(
                result,
                Err(Error::Validation(ValidationError::CrcWidth(w))) if w == width
            );
            prop_assert!(rejected);
        }
    }
}

#[test]
fn test_close_is_idempotent() {
    let mut rig = rig();
    rig.radio.close().unwrap();

    rig.radio.open_receiver(|_| {}).unwrap();
    rig.radio.close().unwrap();
    rig.radio.close().unwrap();

    assert!(!rig.radio.is_open());
    assert_eq!(rig.spi.close_count(), 1);
    assert!(!rig.gpio.is_watched(data_ready()));

    // Reopen in the other role after close
    rig.radio.open_transmitter().unwrap();
    assert_eq!(rig.radio.role(), Some(Role::Transmitter));
}

#[test]
fn test_drop_releases_hardware() {
    let rig = rig();
    let spi = rig.spi.clone();
    let mut radio = rig.radio;
    radio.open_transmitter().unwrap();

    drop(radio);

    assert_eq!(spi.open_bus(), None);
    assert_eq!(spi.close_count(), 1);
}

#[test]
fn test_receiver_callback_and_queue() {
    let mut rig = rig();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    rig.radio
        .open_receiver(move |payload| {
            assert_eq!(payload.len(), 32);
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    rig.spi.load_rx_payload(b"first");
    rig.gpio.trigger(data_ready(), PinState::High);
    rig.gpio.trigger(data_ready(), PinState::Low);
    rig.spi.load_rx_payload(b"second");
    rig.gpio.trigger(data_ready(), PinState::High);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let received = rig.radio.drain_received();
    assert_eq!(received.len(), 64);
    assert_eq!(&received[..5], b"first");
    assert_eq!(&received[32..38], b"second");
    assert!(rig.radio.drain_received().is_empty());
}

#[test]
fn test_drain_received_when_closed() {
    let rig = rig();
    assert!(rig.radio.drain_received().is_empty());
}

#[test]
fn test_no_callbacks_after_close() {
    let mut rig = rig();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    rig.radio
        .open_receiver(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    rig.radio.close().unwrap();

    rig.spi.load_rx_payload(&[1; 32]);
    rig.gpio.trigger(data_ready(), PinState::High);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_close_during_pending_data_ready() {
    let mut rig = rig();
    let pins = PinAssignment::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    rig.radio
        .open_receiver(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    rig.spi.load_rx_payload(&[3; 32]);
    rig.gpio.clear_writes();
    rig.gpio.set_cancel_delay(Duration::from_millis(300));

    let gpio = rig.gpio.clone();
    let edge = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        gpio.trigger(data_ready(), PinState::High);
    });
    rig.radio.close().unwrap();
    edge.join().unwrap();

    assert!(!rig.radio.is_open());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!rig
        .gpio
        .writes()
        .iter()
        .any(|(_, level)| *level == PinState::High));
    for pin in [pins.power_up, pins.chip_enable] {
        assert_eq!(rig.gpio.mode(pin), Some(PinMode::Input));
        assert_eq!(rig.gpio.pull(pin), Some(pin.default_pull()));
    }
    assert_eq!(rig.spi.close_count(), 1);
    assert_eq!(rig.spi.open_bus(), None);
}

#[test]
fn test_concurrent_notifications_and_drains() {
    const PAYLOADS: usize = 200;

    let mut rig = rig();
    rig.radio.open_receiver(|_| {}).unwrap();
    let Rig { radio, gpio, spi } = rig;

    let mut drained = Vec::new();
    thread::scope(|scope| {
        let producer = scope.spawn(move || {
            for n in 0..PAYLOADS {
                spi.load_rx_payload(&[n as u8; 32]);
                gpio.trigger(data_ready(), PinState::High);
                gpio.trigger(data_ready(), PinState::Low);
            }
        });
        while !producer.is_finished() {
            drained.extend(radio.drain_received());
        }
        producer.join().unwrap();
    });
    drained.extend(radio.drain_received());

    let expected: Vec<u8> = (0..PAYLOADS).flat_map(|n| [n as u8; 32]).collect();
    assert_eq!(drained, expected);
}

#[test]
fn test_with_config_bounded_queue() {
    let platform = MockPlatform::new();
    let gpio = platform.gpio_handle();
    let spi = platform.spi_handle();
    let config = DriverConfig {
        queue_bound: QueueBound::Bounded(32),
        ..DriverConfig::default()
    };
    let mut radio = Nrf905::with_config(platform, config).unwrap();
    radio.open_receiver(|_| {}).unwrap();

    for _ in 0..3 {
        spi.load_rx_payload(&[9; 32]);
        gpio.trigger(data_ready(), PinState::High);
    }

    assert_eq!(radio.drain_received(), vec![9; 32]);
    assert_eq!(radio.dropped_bytes(), 64);
}

#[test]
fn test_with_config_rejects_duplicate_pins() {
    let mut config = DriverConfig::default();
    config.pins.address_matched = config.pins.power_up;

    assert!(matches!(
        Nrf905::with_config(MockPlatform::new(), config),
        Err(Error::Validation(ValidationError::DuplicatePin(17)))
    ));
}

#[test]
fn test_read_configuration_while_open() {
    let mut rig = rig();
    assert_eq!(rig.radio.read_configuration(), None);

    rig.radio.set_crc_mode(0i64).unwrap();
    rig.radio.open_transmitter().unwrap();

    let image = rig.radio.read_configuration().unwrap();
    assert_eq!(
        image,
        encode_configuration(433.2, Address::new(0xE7E7_E7E7), CrcMode::Disabled).unwrap()
    );
}
