//! Wire documents.
//!
//! Outbound documents are the unit identity object extended with one key:
//! `"modules"` for status, `"error"` for errors.  Inbound control payloads
//! are a JSON array of `{type, name, value}` commands.

use serde::Deserialize;
use serde_json::Value;

use crate::config::UnitIdentity;
use crate::error::UnitError;
use crate::modules::ModuleStatus;

/// One command of a control payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlCommand {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    /// Absent values decode as `null` and are left for the module to reject.
    #[serde(default)]
    pub value: Value,
}

/// Decode a control body.
///
/// Malformed JSON or wrongly shaped commands reject the whole payload;
/// `null` and `[]` are treated as a parse error too.
pub fn decode_control(body: &str) -> Result<Vec<ControlCommand>, UnitError> {
    let commands: Option<Vec<ControlCommand>> =
        serde_json::from_str(body).map_err(|_| UnitError::PayloadDecode {
            payload: body.to_owned(),
        })?;
    match commands {
        Some(c) if !c.is_empty() => Ok(c),
        _ => Err(UnitError::EmptyPayload),
    }
}

fn document(identity: &UnitIdentity, key: &str, value: Value) -> String {
    let mut map = identity.to_json_map();
    map.insert(key.to_owned(), value);
    serde_json::to_string(&Value::Object(map)).unwrap_or_default()
}

/// `identity ∪ {"modules": [...]}`
pub fn status_document(identity: &UnitIdentity, modules: &[ModuleStatus]) -> String {
    let modules = modules
        .iter()
        .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
        .collect();
    document(identity, "modules", Value::Array(modules))
}

/// `identity ∪ {"error": message}`
pub fn error_document(identity: &UnitIdentity, message: &str) -> String {
    document(identity, "error", Value::String(message.to_owned()))
}
