//! Unified error types for the GrowUnit firmware core.
//!
//! Three families live here:
//!
//! - [`BusError`]: one-wire protocol failures.  Recovered inside the
//!   sensor reader, never seen by the orchestration loops.
//! - [`UnitError`]: everything the orchestration core reports to the
//!   broker.  Every variant terminates in
//!   [`UnitService::report`](crate::app::service::UnitService::report).
//! - [`Error`]: construction and boot failures, surfaced before the loops
//!   start.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::modules::ModuleId;

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No device answered the reset pulse.
    NoPresence,
    /// ROM code or scratchpad failed its CRC-8 check.
    Crc,
    /// The underlying GPIO read or write failed.
    Pin,
    /// ROM search found more devices than the bus supports.
    TooManyDevices,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPresence => write!(f, "no presence pulse"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::Pin => write!(f, "pin I/O failed"),
            Self::TooManyDevices => write!(f, "too many devices on bus"),
        }
    }
}

// ---------------------------------------------------------------------------
// Control rejection (module-level)
// ---------------------------------------------------------------------------

/// A module refused the value it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRejected {
    /// The value had the wrong JSON type or was out of range.
    InvalidValue(&'static str),
    /// The module does not accept control input at all.
    NotControllable,
    /// The hardware refused the change.
    DriverFailed,
}

impl fmt::Display for ControlRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(why) => write!(f, "{}", why),
            Self::NotControllable => write!(f, "module is read-only"),
            Self::DriverFailed => write!(f, "driver failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reportable unit errors
// ---------------------------------------------------------------------------

/// Errors published on the error topic.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitError {
    /// Control body is not a JSON array of `{type, name, value}` objects.
    PayloadDecode { payload: String },
    /// Control body decoded to `null` or an empty array.
    EmptyPayload,
    /// Inbound message arrived on a topic the unit does not handle.
    UnrecognizedTopic { topic: String },
    /// At least one command in the payload matched no registered module.
    UnrecognizedModule { payload: String },
    /// A matched module rejected its value.
    InvalidControlValue {
        module: ModuleId,
        value: String,
        reason: ControlRejected,
    },
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadDecode { payload } => write!(f, "Error! Invalid payload: {}", payload),
            Self::EmptyPayload => write!(f, "Error parsing payload!"),
            Self::UnrecognizedTopic { topic } => {
                write!(f, "Error! Unrecognized topic: {}", topic)
            }
            Self::UnrecognizedModule { payload } => {
                write!(f, "Error! Unrecognized module: {}", payload)
            }
            Self::InvalidControlValue {
                module,
                value,
                reason,
            } => write!(
                f,
                "Error! Invalid value in control payload for {}: {} ({})",
                module, value, reason
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Construction / boot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Two modules share the same `(type, name)` identity.
    DuplicateModule(ModuleId),
    /// A topic does not fit the fixed-capacity topic buffer.
    TopicTooLong,
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Persistent storage failed.
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateModule(id) => write!(f, "duplicate module identity {}", id),
            Self::TopicTooLong => write!(f, "topic exceeds buffer capacity"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl core::error::Error for Error {}

