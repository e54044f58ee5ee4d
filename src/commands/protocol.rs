//! JSON frames exchanged with WebSocket clients
//!
//! Server → client: `{"type":"state","payload":<snapshot>}` and
//! `{"type":"ack","payload":{name, windowId?, desktopIndex?, command}}`.
//!
//! Client → server: `{"type":"command","payload":{name, windowId|id, ...}}`.
//! The `type` discriminator may be omitted when the payload carries both a
//! name and a window id.

use serde::Serialize;
use serde_json::Value;

use crate::snapshot::Snapshot;

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ServerMessage<'a> {
    State(&'a Snapshot),
    Ack(&'a AckPayload),
}

impl ServerMessage<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Acknowledgment of an executed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckPayload {
    pub name: String,
    #[serde(rename = "windowId", skip_serializing_if = "Option::is_none")]
    pub window_id: Option<String>,
    #[serde(rename = "desktopIndex", skip_serializing_if = "Option::is_none")]
    pub desktop_index: Option<String>,
    /// Human-readable trace of what was done
    pub command: String,
}

/// Fields of an inbound command, all optional until validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    pub name: Option<String>,
    pub window_id: Option<String>,
    pub desktop_index: Option<String>,
    pub target_monitor: Option<String>,
    pub target_desktop: Option<String>,
    pub exec: Option<String>,
    pub key: Option<String>,
}

/// Decode a text frame into a command request
///
/// Returns `None` for anything that is not JSON or not a command.
pub fn parse_command_message(text: &str) -> Option<CommandRequest> {
    let envelope: Value = serde_json::from_str(text).ok()?;
    let empty = serde_json::Map::new();
    let payload = envelope
        .get("payload")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let field = |key: &str| payload.get(key).and_then(value_text);
    let name = field("name");
    let window_id = field("windowId").or_else(|| field("id"));

    let tagged = envelope.get("type").and_then(Value::as_str) == Some("command");
    if !tagged && !(name.is_some() && window_id.is_some()) {
        return None;
    }

    Some(CommandRequest {
        name,
        window_id,
        desktop_index: field("desktopIndex"),
        target_monitor: field("targetMonitor"),
        target_desktop: field("targetDesktop"),
        exec: field("exec"),
        key: field("key"),
    })
}

/// Non-empty string or number as text
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
