//! Application core: orchestration logic, zero direct I/O.
//!
//! This module contains the unit's business rules: status reporting,
//! control dispatch, and error routing.  All interaction with hardware and
//! storage happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod payload;
pub mod ports;
pub mod service;
