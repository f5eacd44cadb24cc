//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter / driver ──▶ Port trait ──▶ Module ──▶ UnitService (domain)
//! ```
//!
//! Drivers (one-wire bus, relay pin) and adapters (NVS) implement these
//! traits.  Modules own boxed port objects, so the orchestration core never
//! touches hardware directly and every module is testable with mocks.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::UnitConfig;
use crate::error::BusError;

// ───────────────────────────────────────────────────────────────
// One-wire bus port (driven adapter: hardware → sensor reader)
// ───────────────────────────────────────────────────────────────

/// 64-bit one-wire ROM code: family byte, 48-bit serial, CRC byte.
pub type RomCode = [u8; 8];

/// Length of a DS18x20 scratchpad including its trailing CRC byte.
pub const SCRATCHPAD_LEN: usize = 9;

/// Bus-level operations the temperature sensor reader needs.
///
/// Implementations report protocol failures as [`BusError`]; they never
/// retry on their own.  Recovery policy belongs to the caller.
pub trait OneWireBus {
    /// Enumerate every device ROM code on the bus, in search order.
    fn scan(&mut self) -> Result<Vec<RomCode>, BusError>;

    /// Broadcast "convert T" to every device on the bus.
    fn start_conversion(&mut self) -> Result<(), BusError>;

    /// Read the raw scratchpad of one device.  CRC is *not* checked here.
    fn read_scratchpad(&mut self, rom: &RomCode) -> Result<[u8; SCRATCHPAD_LEN], BusError>;
}

// ───────────────────────────────────────────────────────────────
// Relay driver port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Raw output stage of a relay.  Knows nothing about active levels.
pub trait RelayDriver {
    /// Drive the control line high (`true`) or low (`false`).
    fn set_output(&mut self, high: bool) -> Result<(), DriverError>;
}

/// The relay control line could not be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverError;

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "output pin write failed")
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists unit configuration.
///
/// # Security
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges should be rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ConfigError::NotFound`] if no config was ever saved.
    fn load(&self) -> Result<UnitConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &UnitConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for NVS, relay state, etc.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
