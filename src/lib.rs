//! GrowUnit firmware library.
//!
//! Exposes the orchestration core, modules, and drivers for integration
//! testing and for the firmware binary.  All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod connectivity;
pub mod drivers;
pub mod error;
mod link_shims;
pub mod modules;
pub mod sensors;
pub mod transport;
