//! Sensor drivers.
//!
//! Each sensor wraps a bus port and turns raw bus traffic into
//! engineering units.  Bus failures stay inside the sensor: a flaky read
//! must not stop the status loop.

pub mod ds18b20;

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected 0x8C).
///
/// Used for one-wire ROM codes and DS18x20 scratchpads.  Running it over
/// data *including* its trailing CRC byte yields 0 when intact.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}
