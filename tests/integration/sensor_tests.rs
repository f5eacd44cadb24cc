//! DS18B20 reader against a scripted bus: partial reads and recovery.

use futures_lite::future::block_on;
use growunit::error::BusError;
use growunit::sensors::ds18b20::NO_READING;

use crate::mock_hw::{SimBus, rom, scratchpad, sensor};

#[test]
fn reads_every_probe_in_scan_order() {
    let bus = SimBus::with_readings(&[20.0, 22.5, -3.25]);
    let mut probe = sensor("water", &bus);

    assert_eq!(block_on(probe.read_all()), vec![20.0, 22.5, -3.25]);
    assert_eq!(bus.state().conversions, 1);
}

#[test]
fn failure_after_n_of_m_keeps_the_first_n() {
    for n in 0..3 {
        let bus = SimBus::with_readings(&[20.0, 22.5, 24.0]);
        bus.fail_after_reads(n);
        let mut probe = sensor("water", &bus);

        let readings = block_on(probe.read_all());

        assert_eq!(readings, [20.0, 22.5, 24.0][..n].to_vec(), "n = {n}");
    }
}

#[test]
fn read_first_on_empty_bus_is_sentinel() {
    let mut probe = sensor("water", &SimBus::default());
    assert_eq!(block_on(probe.read_first()), NO_READING);
}

#[test]
fn read_first_after_failed_first_read_is_sentinel() {
    let bus = SimBus::with_readings(&[20.0]);
    bus.fail_after_reads(0);
    let mut probe = sensor("water", &bus);
    assert_eq!(block_on(probe.read_first()), NO_READING);
}

#[test]
fn corrupted_scratchpad_stops_the_cycle() {
    let bus = SimBus::with_readings(&[20.0]);
    let mut bad = scratchpad(30.0);
    bad[0] ^= 0x01;
    bus.0.borrow_mut().devices.push((rom(9), bad));
    bus.0.borrow_mut().devices.push((rom(10), scratchpad(40.0)));
    let mut probe = sensor("water", &bus);

    assert_eq!(block_on(probe.read_all()), vec![20.0]);
}

#[test]
fn foreign_devices_are_ignored() {
    let bus = SimBus::with_readings(&[19.0]);
    let mut eeprom = rom(7);
    eeprom[0] = 0x2D;
    eeprom[7] = growunit::sensors::crc8(&eeprom[..7]);
    bus.0.borrow_mut().devices.insert(0, (eeprom, [0; 9]));
    let mut probe = sensor("water", &bus);

    assert_eq!(block_on(probe.read_all()), vec![19.0]);
    assert_eq!(bus.state().reads, 1);
}

#[test]
fn next_cycle_recovers_after_scan_error() {
    let bus = SimBus::with_readings(&[25.0]);
    bus.fail_next_scan(BusError::Pin);
    let mut probe = sensor("water", &bus);

    assert!(block_on(probe.read_all()).is_empty());
    assert_eq!(block_on(probe.read_all()), vec![25.0]);
    assert_eq!(bus.state().scans, 2);
}
