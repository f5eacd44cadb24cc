//! Relay coil output stage.
//!
//! Wraps any embedded-hal [`OutputPin`] as a [`RelayDriver`].  This is a
//! dumb actuator: active-level translation and persistence live in
//! [`Relay`](crate::modules::relay::Relay).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: a `PinDriver` in output mode.
//! On host/test: any mock pin.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{DriverError, RelayDriver};

pub struct RelayPin<P> {
    pin: P,
    gpio: i32,
}

impl<P: OutputPin> RelayPin<P> {
    pub fn new(pin: P, gpio: i32) -> Self {
        Self { pin, gpio }
    }
}

impl<P: OutputPin> RelayDriver for RelayPin<P> {
    fn set_output(&mut self, high: bool) -> Result<(), DriverError> {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| {
            warn!("RelayPin GPIO{}: write failed ({:?})", self.gpio, e);
            DriverError
        })
    }
}
