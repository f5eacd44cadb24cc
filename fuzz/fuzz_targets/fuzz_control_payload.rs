//! Fuzz target: control payload decoding
//!
//! Feeds arbitrary UTF-8 bodies to `decode_control` and checks:
//! - No panics under any input
//! - A successful decode never yields an empty command list
//! - Every failure maps to a payload error carrying the original body
//!
//! cargo fuzz run fuzz_control_payload

#![no_main]

use growunit::app::payload::decode_control;
use growunit::error::UnitError;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = core::str::from_utf8(data) else {
        return;
    };
    match decode_control(body) {
        Ok(commands) => assert!(!commands.is_empty()),
        Err(UnitError::PayloadDecode { payload }) => assert_eq!(payload, body),
        Err(UnitError::EmptyPayload) => {}
        Err(other) => panic!("unexpected decode error: {other}"),
    }
});
