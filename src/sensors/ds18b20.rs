//! DS18B20 one-wire temperature probe(s).
//!
//! A read cycle is: ROM search → broadcast "convert T" → wait for the
//! conversion to settle → read each scratchpad in search order.  Search
//! order is not stable across sensors, so a unit that needs one
//! deterministic reading should put exactly one probe on the bus.
//!
//! ## Failure policy
//!
//! Any [`BusError`] aborts the rest of the cycle.  Readings collected so far
//! are returned and the error is logged; nothing propagates to the caller.

use core::time::Duration;

use log::{debug, warn};

use super::crc8;
use crate::app::ports::{OneWireBus, RomCode, SCRATCHPAD_LEN};
use crate::error::BusError;
use crate::modules::{ModuleId, ModuleStatus, StatusDetail};

/// Type tag reported in status documents.
pub const DS18B20_TYPE: &str = "ds18b20";

/// Reading reported when no probe answered or the cycle failed.
pub const NO_READING: f32 = -1.0;

/// Conversion time at 12-bit resolution.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(750);

/// DS18S20, DS1822 and DS18B20 family codes.
const TEMPERATURE_FAMILIES: [u8; 3] = [0x10, 0x22, 0x28];

pub struct TemperatureSensor {
    id: ModuleId,
    bus: Box<dyn OneWireBus>,
    settle_delay: Duration,
}

impl TemperatureSensor {
    pub fn new(name: impl Into<String>, bus: Box<dyn OneWireBus>) -> Self {
        Self {
            id: ModuleId::new(DS18B20_TYPE, name),
            bus,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Celsius readings for every probe found, in search order.
    pub async fn read_all(&mut self) -> Vec<f32> {
        let mut readings = Vec::new();
        if let Err(e) = self.read_cycle(&mut readings).await {
            warn!(
                "{}: unable to read temp sensor(s): {} ({} reading(s) kept)",
                self.id,
                e,
                readings.len()
            );
        }
        readings
    }

    /// First reading, or [`NO_READING`].
    pub async fn read_first(&mut self) -> f32 {
        self.read_all().await.first().copied().unwrap_or(NO_READING)
    }

    pub async fn status(&mut self) -> ModuleStatus {
        let reading = self.read_first().await;
        ModuleStatus {
            kind: DS18B20_TYPE,
            name: self.id.name.clone(),
            detail: StatusDetail::Reading { reading },
        }
    }

    async fn read_cycle(&mut self, readings: &mut Vec<f32>) -> Result<(), BusError> {
        let sensors: Vec<RomCode> = self
            .bus
            .scan()?
            .into_iter()
            .filter(|rom| TEMPERATURE_FAMILIES.contains(&rom[0]))
            .collect();
        if sensors.is_empty() {
            debug!("{}: no probes on bus", self.id);
            return Ok(());
        }
        self.bus.start_conversion()?;
        async_io_mini::Timer::after(self.settle_delay).await;
        for rom in &sensors {
            let scratchpad = self.bus.read_scratchpad(rom)?;
            readings.push(decode_scratchpad(&scratchpad)?);
        }
        Ok(())
    }
}

/// Validate a scratchpad's CRC and convert its temperature register.
pub fn decode_scratchpad(scratchpad: &[u8; SCRATCHPAD_LEN]) -> Result<f32, BusError> {
    if crc8(scratchpad) != 0 {
        return Err(BusError::Crc);
    }
    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    Ok(f32::from(raw) / 16.0)
}
