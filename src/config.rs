//! Unit configuration parameters
//!
//! Everything that is fixed for the lifetime of the process: unit identity,
//! broker topics, timing, and per-module wiring.  Loaded once at boot through
//! [`ConfigPort`](crate::app::ports::ConfigPort); defaults apply on first boot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::ports::ConfigError;
use crate::transport::TOPIC_CAPACITY;

/// Identity field that every unit reports.  Derived from the MAC when absent.
pub const UNIT_ID_KEY: &str = "unitID";

/// Identifying fields merged into every outbound document.
///
/// Stored as an ordered list rather than a map so the config blob stays
/// postcard-friendly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitIdentity {
    pub fields: Vec<(String, String)>,
}

impl UnitIdentity {
    pub fn new<K: Into<String>, V: Into<String>>(fields: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: &str, value: &str) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_owned(),
            None => self.fields.push((key.to_owned(), value.to_owned())),
        }
    }

    /// JSON object holding every identity field, ready to be extended.
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

/// Broker topics.  The two inbound topics must differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Outbound status documents.
    pub status: String,
    /// Outbound error documents.
    pub error: String,
    /// Inbound control payloads.
    pub control: String,
    /// Inbound "send status now" requests.
    pub status_request: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            status: "growunit/status".into(),
            error: "growunit/error".into(),
            control: "growunit/control".into(),
            status_request: "growunit/status-request".into(),
        }
    }
}

/// Temperature probe wiring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Module name reported in status documents.
    pub name: String,
    /// One-wire data GPIO.
    pub gpio: i32,
    /// Wait between "convert T" and reading the scratchpads (ms).
    /// 750 ms covers 12-bit resolution.
    pub settle_delay_ms: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            name: "waterTemperatureCelsius".into(),
            gpio: 4,
            settle_delay_ms: 750,
        }
    }
}

/// Which pin level energises a relay coil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveLevel {
    High,
    Low,
}

/// Relay wiring and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Module name reported in status documents and matched by control.
    pub name: String,
    /// Output GPIO.
    pub gpio: i32,
    pub active_level: ActiveLevel,
    /// NVS key holding the last commanded state (max 15 chars).
    pub persistence_key: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            name: "growlight".into(),
            gpio: 5,
            active_level: ActiveLevel::Low,
            persistence_key: "growlight".into(),
        }
    }
}

/// WiFi and broker settings consumed by the transport adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// e.g. `mqtt://broker.local:1883`
    pub broker_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            broker_url: "mqtt://broker.local:1883".into(),
        }
    }
}

/// Core unit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub identity: UnitIdentity,
    pub topics: TopicConfig,
    /// Seconds between periodic status broadcasts
    pub status_interval_secs: u32,
    pub sensor: SensorConfig,
    pub relay: RelayConfig,
    pub network: NetworkConfig,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            identity: UnitIdentity::new([("project", "growunit"), ("unitType", "hydroponic")]),
            topics: TopicConfig::default(),
            status_interval_secs: 60,
            sensor: SensorConfig::default(),
            relay: RelayConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

fn validate_topic(topic: &str, field: &'static str) -> Result<(), ConfigError> {
    if topic.is_empty() || topic.len() > TOPIC_CAPACITY {
        return Err(ConfigError::ValidationFailed(field));
    }
    Ok(())
}

/// Range-check every field.  Called before persisting.
pub fn validate_config(cfg: &UnitConfig) -> Result<(), ConfigError> {
    let t = &cfg.topics;
    validate_topic(&t.status, "topics.status must be 1–64 bytes")?;
    validate_topic(&t.error, "topics.error must be 1–64 bytes")?;
    validate_topic(&t.control, "topics.control must be 1–64 bytes")?;
    validate_topic(&t.status_request, "topics.status_request must be 1–64 bytes")?;
    if t.control == t.status_request {
        return Err(ConfigError::ValidationFailed(
            "topics.control and topics.status_request must differ",
        ));
    }
    if !(1..=86_400).contains(&cfg.status_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "status_interval_secs must be 1–86400",
        ));
    }
    if cfg.sensor.name.is_empty() {
        return Err(ConfigError::ValidationFailed("sensor.name must not be empty"));
    }
    if cfg.sensor.settle_delay_ms > 2000 {
        return Err(ConfigError::ValidationFailed(
            "sensor.settle_delay_ms must be 0–2000",
        ));
    }
    if cfg.relay.name.is_empty() {
        return Err(ConfigError::ValidationFailed("relay.name must not be empty"));
    }
    if cfg.relay.persistence_key.is_empty() || cfg.relay.persistence_key.len() > 15 {
        return Err(ConfigError::ValidationFailed(
            "relay.persistence_key must be 1–15 bytes",
        ));
    }
    if cfg.sensor.gpio == cfg.relay.gpio {
        return Err(ConfigError::ValidationFailed(
            "sensor.gpio and relay.gpio must differ",
        ));
    }
    Ok(())
}
