// Control channel payloads
// Author: storecache contributors

use serde::Serialize;
use serde_json::Value;

/// Commands the page may post to the cache manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SkipWaiting,
}

impl ControlMessage {
    /// Recognize a payload of the form `{"type": "SKIP_WAITING"}`.
    /// Anything else is not a command.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        match payload.get("type").and_then(Value::as_str) {
            Some("SKIP_WAITING") => Some(ControlMessage::SkipWaiting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// The waiting generation was activated.
    Activated { version: String },
    /// The generation still installing will activate once installed.
    Scheduled { version: String },
    /// Nothing was installing or waiting.
    NothingWaiting,
    /// The payload was not a recognized command.
    Ignored,
}
