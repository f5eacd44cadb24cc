//! Hardware modules addressable by the broker.
//!
//! Every module has a fixed `(type, name)` identity and can describe its
//! status on demand.  Some modules also accept control input.  The set is
//! closed: [`Module`] is an enum and dispatch is a linear scan over
//! identities, which is plenty for the handful of modules a unit carries.

pub mod relay;

use core::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ControlRejected;
use crate::sensors::ds18b20::TemperatureSensor;
use relay::Relay;

/// Dispatch key of a module.  Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    pub kind: &'static str,
    pub name: String,
}

impl ModuleId {
    pub fn new(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn matches(&self, kind: &str, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Module-specific status fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusDetail {
    /// Celsius, or [`NO_READING`](crate::sensors::ds18b20::NO_READING).
    Reading { reading: f32 },
    Switch { state: bool },
}

/// One entry of the status document's `modules` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStatus {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    #[serde(flatten)]
    pub detail: StatusDetail,
}

/// Every module kind the unit can host.
pub enum Module {
    TemperatureSensor(TemperatureSensor),
    Relay(Relay),
}

impl Module {
    pub fn id(&self) -> &ModuleId {
        match self {
            Self::TemperatureSensor(s) => s.id(),
            Self::Relay(r) => r.id(),
        }
    }

    /// Produce a fresh snapshot.  Always yields a result; sensors fall back
    /// to their sentinel reading on bus failure.
    pub async fn status(&mut self) -> ModuleStatus {
        match self {
            Self::TemperatureSensor(s) => s.status().await,
            Self::Relay(r) => r.status(),
        }
    }

    pub fn accepts_control(&self) -> bool {
        matches!(self, Self::Relay(_))
    }

    pub fn handle_control(&mut self, value: &Value) -> Result<(), ControlRejected> {
        match self {
            Self::TemperatureSensor(_) => Err(ControlRejected::NotControllable),
            Self::Relay(r) => r.handle_control(value),
        }
    }
}

impl From<TemperatureSensor> for Module {
    fn from(sensor: TemperatureSensor) -> Self {
        Self::TemperatureSensor(sensor)
    }
}

impl From<Relay> for Module {
    fn from(relay: Relay) -> Self {
        Self::Relay(relay)
    }
}
