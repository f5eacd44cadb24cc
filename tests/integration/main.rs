//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock hardware.  All tests run on the host (x86_64) with no
//! real hardware required.

mod control_tests;
mod loop_tests;
mod mock_hw;
mod sensor_tests;
