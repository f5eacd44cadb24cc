//! Pin-level drivers behind the bus and actuator ports.

pub mod onewire;
pub mod relay;
