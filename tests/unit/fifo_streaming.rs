//! Unit tests for FIFO streaming, counting and alignment

use crate::common::{Operation, create_mock_driver};
use icm20948_multi::{Bank, Error, FifoContent, FifoMode, Triple};

#[test]
fn test_start_fifo_writes_enable_bits_and_records_content() {
    let (mut driver, bus) = create_mock_driver();

    driver.start_fifo(FifoContent::AccelGyro).unwrap();

    assert_eq!(bus.get_register(Bank::Bank0, 0x67), 0x1E);
    assert_eq!(driver.fifo_content(), Some(FifoContent::AccelGyro));
}

#[test]
fn test_stop_fifo_keeps_recorded_content() {
    let (mut driver, bus) = create_mock_driver();

    driver.start_fifo(FifoContent::Gyro).unwrap();
    driver.stop_fifo().unwrap();

    assert_eq!(bus.get_register(Bank::Bank0, 0x67), 0x00);
    // Stale but still available for draining already-buffered data
    assert_eq!(driver.fifo_content(), Some(FifoContent::Gyro));
}

#[test]
fn test_reset_fifo_pulses_reset_bits_and_empties_buffer() {
    let (mut driver, bus) = create_mock_driver();
    bus.load_fifo(&[0xAA; 24]);
    bus.clear_operations();

    driver.reset_fifo().unwrap();

    assert_eq!(bus.fifo_len(), 0);
    let writes: Vec<u8> = bus
        .operations()
        .iter()
        .filter_map(|op| match op {
            Operation::Write {
                bank: Bank::Bank0,
                address: 0x68,
                value,
                ..
            } => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec![0x1F, 0x00], "reset bits must be set then cleared");
}

#[test]
fn test_fifo_count_is_big_endian() {
    let (mut driver, bus) = create_mock_driver();

    bus.load_fifo(&vec![0; 300]);
    assert_eq!(driver.fifo_count().unwrap(), 300);
}

#[test]
fn test_sample_sets_drop_remainder() {
    let (mut driver, bus) = create_mock_driver();
    driver.start_fifo(FifoContent::AccelGyro).unwrap();

    bus.load_fifo(&vec![0; 13]);
    assert_eq!(driver.fifo_sample_sets().unwrap(), 1);

    bus.load_fifo(&vec![0; 11]); // 24 total
    assert_eq!(driver.fifo_sample_sets().unwrap(), 2);
}

#[test]
fn test_sample_sets_single_channel_divisor() {
    let (mut driver, bus) = create_mock_driver();
    driver.start_fifo(FifoContent::Accel).unwrap();

    bus.load_fifo(&vec![0; 13]);
    assert_eq!(driver.fifo_sample_sets().unwrap(), 2);
}

#[test]
fn test_sample_sets_without_content_is_invalid() {
    let (mut driver, _bus) = create_mock_driver();
    assert!(matches!(
        driver.fifo_sample_sets(),
        Err(Error::InvalidConfig)
    ));
}

#[test]
fn test_align_fifo_drains_stray_bytes() {
    let (mut driver, bus) = create_mock_driver();
    driver.start_fifo(FifoContent::AccelGyro).unwrap();

    bus.load_fifo(&vec![0; 13]);
    driver.align_fifo().unwrap();

    assert_eq!(
        bus.fifo_len(),
        12,
        "one stray byte past the set boundary must be drained"
    );

    // Already aligned: a second call reads nothing further
    driver.align_fifo().unwrap();
    assert_eq!(bus.fifo_len(), 12);
}

#[test]
fn test_read_fifo_triple_byte_order() {
    let (mut driver, bus) = create_mock_driver();

    bus.load_fifo(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    let triple = driver.read_fifo_triple().unwrap();

    // Big-endian pairs, H register first (datasheet order)
    assert_eq!(triple, Triple::new(258.0, 772.0, 1286.0));
}

#[test]
fn test_read_fifo_triple_sign_extension() {
    let (mut driver, bus) = create_mock_driver();

    bus.load_fifo(&[0xFF, 0xFE, 0x80, 0x00, 0x7F, 0xFF]);
    let triple = driver.read_fifo_triple().unwrap();

    assert_eq!(triple, Triple::new(-2.0, -32768.0, 32767.0));
}

#[test]
fn test_read_fifo_triples_drains_whole_sets() {
    let (mut driver, bus) = create_mock_driver();
    driver.start_fifo(FifoContent::AccelGyro).unwrap();

    // Two interleaved sets plus one stray byte
    let mut data = Vec::new();
    for word in 0u8..8 {
        data.extend_from_slice(&[0x00, word + 1]);
    }
    data.extend_from_slice(&[0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x05]);
    data.push(0xEE);
    bus.load_fifo(&data);

    let triples = driver.read_fifo_triples::<8>().unwrap();
    assert_eq!(triples.len(), 4, "two dual-channel sets hold four triples");
    assert_eq!(triples[0], Triple::new(1.0, 2.0, 3.0));

    // The stray byte stays buffered for a later align
    assert_eq!(bus.fifo_len(), 1);
}

#[test]
fn test_read_fifo_triples_overflow_is_reported() {
    let (mut driver, bus) = create_mock_driver();
    driver.start_fifo(FifoContent::Accel).unwrap();

    bus.load_fifo(&vec![0; 18]); // three sets
    assert!(matches!(
        driver.read_fifo_triples::<2>(),
        Err(Error::FifoOverflow)
    ));
}

#[test]
fn test_set_fifo_mode() {
    let (mut driver, bus) = create_mock_driver();

    driver.set_fifo_mode(FifoMode::StopWhenFull).unwrap();
    assert_eq!(bus.get_register(Bank::Bank0, 0x69), 0x01);

    driver.set_fifo_mode(FifoMode::Continuous).unwrap();
    assert_eq!(bus.get_register(Bank::Bank0, 0x69), 0x00);
}

#[test]
fn test_enable_fifo_toggles_user_ctrl_bit() {
    let (mut driver, bus) = create_mock_driver();

    driver.enable_fifo(true).unwrap();
    assert_eq!(bus.get_register(Bank::Bank0, 0x03) & 0x40, 0x40);

    driver.enable_fifo(false).unwrap();
    assert_eq!(bus.get_register(Bank::Bank0, 0x03) & 0x40, 0x00);
}
