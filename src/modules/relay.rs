//! Relay actuator module.
//!
//! A boolean switch (grow light, pump, heater) behind a [`RelayDriver`].
//! The logical state survives reboots: every accepted change is written to
//! [`StoragePort`] and restored at construction.
//!
//! ## Active level
//!
//! Many relay boards energise the coil on a LOW input.  The module keeps the
//! logical state (`on`) separate from the pin level and translates through
//! [`ActiveLevel`].

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ModuleId, ModuleStatus, StatusDetail};
use crate::app::ports::{RelayDriver, StorageError, StoragePort};
use crate::config::ActiveLevel;
use crate::error::ControlRejected;

/// Type tag reported in status documents.
pub const RELAY_TYPE: &str = "relay";

/// NVS namespace for persisted relay states.
pub const RELAY_NAMESPACE: &str = "relay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedState {
    on: bool,
}

pub struct Relay {
    id: ModuleId,
    driver: Box<dyn RelayDriver>,
    active_level: ActiveLevel,
    storage: Box<dyn StoragePort>,
    persistence_key: String,
    on: bool,
}

impl Relay {
    /// Build the relay, restore its last persisted state, and drive the pin
    /// to match.  A missing or unreadable record means "off".
    pub fn new(
        name: impl Into<String>,
        driver: Box<dyn RelayDriver>,
        active_level: ActiveLevel,
        storage: Box<dyn StoragePort>,
        persistence_key: impl Into<String>,
    ) -> Self {
        let mut relay = Self {
            id: ModuleId::new(RELAY_TYPE, name),
            driver,
            active_level,
            storage,
            persistence_key: persistence_key.into(),
            on: false,
        };
        let restored = relay.load_state().unwrap_or_else(|e| {
            if e != StorageError::NotFound {
                warn!("Relay {}: state restore failed ({}), defaulting off", relay.id, e);
            }
            false
        });
        if relay.apply(restored).is_err() {
            warn!("Relay {}: could not drive initial state", relay.id);
        }
        info!("Relay {} initialised, on={}", relay.id, relay.on);
        relay
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn status(&self) -> ModuleStatus {
        ModuleStatus {
            kind: RELAY_TYPE,
            name: self.id.name.clone(),
            detail: StatusDetail::Switch { state: self.on },
        }
    }

    /// Accepts `true`/`false` or `1`/`0`.
    pub fn handle_control(&mut self, value: &Value) -> Result<(), ControlRejected> {
        let on = parse_switch_value(value)?;
        self.set(on)
    }

    /// Switch the relay and persist the new state.
    pub fn set(&mut self, on: bool) -> Result<(), ControlRejected> {
        self.apply(on)?;
        if let Err(e) = self.save_state() {
            warn!("Relay {}: failed to persist state ({})", self.id, e);
        }
        info!("Relay {} switched {}", self.id, if on { "on" } else { "off" });
        Ok(())
    }

    fn apply(&mut self, on: bool) -> Result<(), ControlRejected> {
        let high = match self.active_level {
            ActiveLevel::High => on,
            ActiveLevel::Low => !on,
        };
        self.driver
            .set_output(high)
            .map_err(|_| ControlRejected::DriverFailed)?;
        self.on = on;
        Ok(())
    }

    fn load_state(&self) -> Result<bool, StorageError> {
        let mut buf = [0u8; 8];
        let n = self
            .storage
            .read(RELAY_NAMESPACE, &self.persistence_key, &mut buf)?;
        let state: PersistedState =
            postcard::from_bytes(&buf[..n]).map_err(|_| StorageError::IoError)?;
        Ok(state.on)
    }

    fn save_state(&mut self) -> Result<(), StorageError> {
        let mut buf = [0u8; 8];
        let bytes = postcard::to_slice(&PersistedState { on: self.on }, &mut buf)
            .map_err(|_| StorageError::IoError)?;
        self.storage
            .write(RELAY_NAMESPACE, &self.persistence_key, bytes)
    }
}

fn parse_switch_value(value: &Value) -> Result<bool, ControlRejected> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ControlRejected::InvalidValue("expected 0 or 1")),
        },
        _ => Err(ControlRejected::InvalidValue("expected boolean")),
    }
}
