//! The JSON envelope the Bedrock client speaks: a `header` that routes the
//! message and a free-form `body`. Only the documented fields are emitted;
//! unknown inbound fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Routing discriminator carried in `header.messagePurpose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessagePurpose {
    CommandRequest,
    CommandResponse,
    Event,
    Error,
    Subscribe,
    Unsubscribe,
    /// Anything this crate does not know; logged and ignored.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub request_id: String,
    pub message_purpose: MessagePurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// A command request in the shape the game expects. The command always
    /// claims player origin; that is what the in-game websocket accepts.
    pub fn command_request(request_id: &Uuid, command_line: &str) -> Self {
        Envelope {
            header: Header {
                version: 1,
                request_id: request_id.to_string(),
                message_purpose: MessagePurpose::CommandRequest,
                message_type: Some("commandRequest".to_string()),
            },
            body: json!({
                "version": 1,
                "commandLine": command_line,
                "origin": { "type": "player" },
            }),
        }
    }

    /// A subscribe or unsubscribe request for one event name.
    pub fn subscription(purpose: MessagePurpose, event_name: &str) -> Self {
        Envelope {
            header: Header {
                version: 1,
                request_id: Uuid::new_v4().to_string(),
                message_purpose: purpose,
                message_type: Some("commandRequest".to_string()),
            },
            body: json!({ "eventName": event_name }),
        }
    }
}

/// Body of a `commandResponse` (or `error`) envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStatus {
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub status_message: String,
}

/// Body of an `event` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub event_name: String,
    #[serde(default)]
    pub properties: Value,
}
