//! Bit-banged 1-Wire bus master (standard speed).
//!
//! Drives a single open-drain GPIO with an external 4.7 kΩ pull-up and
//! busy-waits the slot timings with a microsecond [`DelayNs`].  Implements
//! [`OneWireBus`] so the DS18B20 reader never sees pin-level details.
//!
//! ## Timing (µs)
//!
//! | Phase        | Low  | Release / sample           |
//! |--------------|------|----------------------------|
//! | Reset        | 480  | sample at +70, recover 410 |
//! | Write 1      | 6    | 64                         |
//! | Write 0      | 60   | 10                         |
//! | Read         | 6    | sample at +9, recover 55   |
//!
//! ## Dual-target design
//!
//! On ESP-IDF: a `PinDriver` in input-output open-drain mode plus `Ets`.
//! On host/test: any mock implementing the embedded-hal traits.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{OneWireBus, RomCode, SCRATCHPAD_LEN};
use crate::error::BusError;
use crate::sensors::crc8;

const CMD_SEARCH_ROM: u8 = 0xF0;
const CMD_MATCH_ROM: u8 = 0x55;
const CMD_SKIP_ROM: u8 = 0xCC;
const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;

/// Upper bound on devices collected by one [`OneWireBus::scan`].
pub const MAX_DEVICES: usize = 16;

/// Resumable state of the Maxim ROM search algorithm.
#[derive(Debug, Default)]
struct SearchState {
    rom: RomCode,
    last_discrepancy: u8,
    last_device: bool,
}

pub struct OneWirePin<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OneWirePin<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Takes ownership of the pin and releases the bus (line high).
    pub fn new(mut pin: P, delay: D) -> Result<Self, BusError> {
        pin.set_high().map_err(|_| BusError::Pin)?;
        Ok(Self { pin, delay })
    }

    /// Reset pulse.  Returns `true` when at least one device answered.
    pub fn reset(&mut self) -> Result<bool, BusError> {
        self.pin.set_low().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(480);
        self.pin.set_high().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(70);
        let present = self.pin.is_low().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(410);
        Ok(present)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), BusError> {
        let (low_us, release_us) = if bit { (6, 64) } else { (60, 10) };
        self.pin.set_low().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(low_us);
        self.pin.set_high().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(release_us);
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, BusError> {
        self.pin.set_low().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(6);
        self.pin.set_high().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(9);
        let bit = self.pin.is_high().map_err(|_| BusError::Pin)?;
        self.delay.delay_us(55);
        Ok(bit)
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), BusError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, BusError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    /// Reset and demand a presence pulse.
    fn reset_expect_presence(&mut self) -> Result<(), BusError> {
        if self.reset()? {
            Ok(())
        } else {
            Err(BusError::NoPresence)
        }
    }

    /// One step of the ROM search.  `Ok(None)` once every device was found.
    fn search_next(&mut self, state: &mut SearchState) -> Result<Option<RomCode>, BusError> {
        if state.last_device {
            return Ok(None);
        }
        if !self.reset()? {
            return Ok(None);
        }
        self.write_byte(CMD_SEARCH_ROM)?;

        let mut last_zero = 0u8;
        for bit_number in 1..=64u8 {
            let byte = usize::from((bit_number - 1) / 8);
            let mask = 1u8 << ((bit_number - 1) % 8);

            let id_bit = self.read_bit()?;
            let cmp_bit = self.read_bit()?;
            if id_bit && cmp_bit {
                // Nobody answered this bit: devices vanished mid-search.
                return Err(BusError::NoPresence);
            }

            let direction = if id_bit != cmp_bit {
                id_bit
            } else if bit_number < state.last_discrepancy {
                state.rom[byte] & mask != 0
            } else {
                bit_number == state.last_discrepancy
            };
            if id_bit == cmp_bit && !direction {
                last_zero = bit_number;
            }

            if direction {
                state.rom[byte] |= mask;
            } else {
                state.rom[byte] &= !mask;
            }
            self.write_bit(direction)?;
        }

        state.last_discrepancy = last_zero;
        state.last_device = last_zero == 0;
        if crc8(&state.rom) != 0 {
            return Err(BusError::Crc);
        }
        Ok(Some(state.rom))
    }
}

impl<P, D> OneWireBus for OneWirePin<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn scan(&mut self) -> Result<Vec<RomCode>, BusError> {
        let mut state = SearchState::default();
        let mut found = Vec::new();
        while let Some(rom) = self.search_next(&mut state)? {
            if found.len() == MAX_DEVICES {
                return Err(BusError::TooManyDevices);
            }
            found.push(rom);
        }
        Ok(found)
    }

    fn start_conversion(&mut self) -> Result<(), BusError> {
        self.reset_expect_presence()?;
        self.write_byte(CMD_SKIP_ROM)?;
        self.write_byte(CMD_CONVERT_T)
    }

    fn read_scratchpad(&mut self, rom: &RomCode) -> Result<[u8; SCRATCHPAD_LEN], BusError> {
        self.reset_expect_presence()?;
        self.write_byte(CMD_MATCH_ROM)?;
        for &b in rom {
            self.write_byte(b)?;
        }
        self.write_byte(CMD_READ_SCRATCHPAD)?;
        let mut scratchpad = [0u8; SCRATCHPAD_LEN];
        for b in &mut scratchpad {
            *b = self.read_byte()?;
        }
        Ok(scratchpad)
    }
}
