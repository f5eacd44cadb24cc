//! Fuzz target: DS18x20 scratchpad decoding
//!
//! Arbitrary 9-byte scratchpads must either fail the CRC check or decode
//! to a temperature inside the signed 16-bit register range.
//!
//! cargo fuzz run fuzz_scratchpad

#![no_main]

use growunit::sensors::crc8;
use growunit::sensors::ds18b20::decode_scratchpad;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: [u8; 9]| {
    match decode_scratchpad(&data) {
        Ok(celsius) => {
            assert_eq!(crc8(&data), 0);
            assert!((-2048.0..2048.0).contains(&celsius));
        }
        Err(_) => assert_ne!(crc8(&data), 0),
    }
});
