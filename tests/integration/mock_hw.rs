//! Mock hardware for integration tests.
//!
//! Every mock is a cheap handle over shared state, so a test can hand one
//! clone to a module and keep another to script faults and inspect the
//! recorded traffic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use growunit::app::ports::{
    DriverError, OneWireBus, RelayDriver, RomCode, SCRATCHPAD_LEN, StorageError, StoragePort,
};
use growunit::app::service::UnitService;
use growunit::config::{ActiveLevel, TopicConfig, UnitIdentity};
use growunit::connectivity::ConnectivityState;
use growunit::error::BusError;
use growunit::modules::Module;
use growunit::modules::relay::Relay;
use growunit::sensors::crc8;
use growunit::sensors::ds18b20::TemperatureSensor;
use growunit::transport::MessageQueues;
use serde_json::Value;

// ── One-wire bus ──────────────────────────────────────────────

/// A DS18B20 ROM code with a valid CRC.
pub fn rom(serial: u8) -> RomCode {
    let mut rom = [0x28, serial, 0, 0, 0, 0, 0, 0];
    rom[7] = crc8(&rom[..7]);
    rom
}

/// A 12-bit scratchpad holding `celsius`, with a valid CRC.
pub fn scratchpad(celsius: f32) -> [u8; SCRATCHPAD_LEN] {
    let [lo, hi] = ((celsius * 16.0) as i16).to_le_bytes();
    let mut sp = [lo, hi, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0];
    sp[8] = crc8(&sp[..8]);
    sp
}

#[derive(Default)]
pub struct BusState {
    pub devices: Vec<(RomCode, [u8; SCRATCHPAD_LEN])>,
    /// Error returned by the next scan.
    pub scan_error: Option<BusError>,
    /// Reads that succeed before every further read fails with `Crc`.
    pub reads_before_failure: Option<usize>,
    pub scans: usize,
    pub conversions: usize,
    pub reads: usize,
}

#[derive(Clone, Default)]
pub struct SimBus(pub Rc<RefCell<BusState>>);

#[allow(dead_code)]
impl SimBus {
    pub fn with_readings(readings: &[f32]) -> Self {
        let bus = Self::default();
        bus.0.borrow_mut().devices = readings
            .iter()
            .enumerate()
            .map(|(i, &c)| (rom(i as u8 + 1), scratchpad(c)))
            .collect();
        bus
    }

    pub fn fail_after_reads(&self, n: usize) {
        self.0.borrow_mut().reads_before_failure = Some(n);
    }

    pub fn fail_next_scan(&self, err: BusError) {
        self.0.borrow_mut().scan_error = Some(err);
    }

    pub fn state(&self) -> std::cell::Ref<'_, BusState> {
        self.0.borrow()
    }
}

impl OneWireBus for SimBus {
    fn scan(&mut self) -> Result<Vec<RomCode>, BusError> {
        let mut s = self.0.borrow_mut();
        s.scans += 1;
        if let Some(e) = s.scan_error.take() {
            return Err(e);
        }
        Ok(s.devices.iter().map(|(rom, _)| *rom).collect())
    }

    fn start_conversion(&mut self) -> Result<(), BusError> {
        let mut s = self.0.borrow_mut();
        if s.devices.is_empty() {
            return Err(BusError::NoPresence);
        }
        s.conversions += 1;
        Ok(())
    }

    fn read_scratchpad(&mut self, rom: &RomCode) -> Result<[u8; SCRATCHPAD_LEN], BusError> {
        let mut s = self.0.borrow_mut();
        if s.reads_before_failure.is_some_and(|n| s.reads >= n) {
            return Err(BusError::Crc);
        }
        s.reads += 1;
        s.devices
            .iter()
            .find(|(r, _)| r == rom)
            .map(|(_, sp)| *sp)
            .ok_or(BusError::NoPresence)
    }
}

pub fn sensor(name: &str, bus: &SimBus) -> TemperatureSensor {
    TemperatureSensor::new(name, Box::new(bus.clone())).with_settle_delay(Duration::ZERO)
}

// ── Relay output ──────────────────────────────────────────────

/// Records every level driven onto the relay line.
#[derive(Clone, Default)]
pub struct RecordingPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
    pub broken: Rc<RefCell<bool>>,
}

#[allow(dead_code)]
impl RecordingPin {
    pub fn writes(&self) -> usize {
        self.levels.borrow().len()
    }

    pub fn last(&self) -> Option<bool> {
        self.levels.borrow().last().copied()
    }
}

impl RelayDriver for RecordingPin {
    fn set_output(&mut self, high: bool) -> Result<(), DriverError> {
        if *self.broken.borrow() {
            return Err(DriverError);
        }
        self.levels.borrow_mut().push(high);
        Ok(())
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockStorage(Rc<RefCell<HashMap<String, Vec<u8>>>>);

impl MockStorage {
    fn key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl StoragePort for MockStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let store = self.0.borrow();
        let v = store
            .get(&Self::key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        let n = v.len().min(buf.len());
        buf[..n].copy_from_slice(&v[..n]);
        Ok(n)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.0
            .borrow_mut()
            .insert(Self::key(namespace, key), data.to_vec());
        Ok(())
    }
}

pub fn relay(name: &str, pin: &RecordingPin, storage: &MockStorage) -> Relay {
    Relay::new(
        name,
        Box::new(pin.clone()),
        ActiveLevel::High,
        Box::new(storage.clone()),
        name,
    )
}

// ── Unit assembly ─────────────────────────────────────────────

pub fn identity() -> UnitIdentity {
    UnitIdentity::new([("unitID", "GU-0A0B0C"), ("project", "growunit")])
}

pub fn ready_link() -> ConnectivityState {
    let link = ConnectivityState::new();
    link.set_network_up(true);
    link.set_session_up(true);
    link
}

pub fn unit<'q>(
    queues: &'q MessageQueues,
    link: ConnectivityState,
    modules: Vec<Module>,
) -> UnitService<'q> {
    UnitService::new(
        identity(),
        TopicConfig::default(),
        Duration::from_secs(60),
        modules,
        queues,
        link,
    )
    .unwrap()
}

/// Standard unit: water probe at 21.5 °C plus a `growlight` relay.
pub struct Rig {
    pub bus: SimBus,
    pub pin: RecordingPin,
    pub storage: MockStorage,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self {
            bus: SimBus::with_readings(&[21.5]),
            pin: RecordingPin::default(),
            storage: MockStorage::default(),
        }
    }

    pub fn modules(&self) -> Vec<Module> {
        vec![
            sensor("waterTemperatureCelsius", &self.bus).into(),
            relay("growlight", &self.pin, &self.storage).into(),
        ]
    }
}

// ── Outbound inspection ───────────────────────────────────────

/// Every queued outbound message as `(topic, parsed body)`.
pub fn drain(queues: &MessageQueues) -> Vec<(String, Value)> {
    std::iter::from_fn(|| queues.try_take_outgoing())
        .map(|m| {
            let body = serde_json::from_str(&m.body).unwrap();
            (m.topic.to_string(), body)
        })
        .collect()
}

#[allow(dead_code)]
pub fn errors(sent: &[(String, Value)]) -> Vec<String> {
    sent.iter()
        .filter(|(topic, _)| topic == "growunit/error")
        .map(|(_, doc)| doc["error"].as_str().unwrap_or_default().to_owned())
        .collect()
}

#[allow(dead_code)]
pub fn statuses(sent: &[(String, Value)]) -> Vec<Value> {
    sent.iter()
        .filter(|(topic, _)| topic == "growunit/status")
        .map(|(_, doc)| doc.clone())
        .collect()
}
