use serde::{Deserialize, Deserializer, Serialize};

/// One message as carried on the wire. `role` stays a free-form string here;
/// mapping to transcript roles happens at the provider boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    pub message: String,
    pub session_id: String,
    /// Explicit prior turns. Omitted when the server keeps session context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<WireMessage>>,
}

impl ChatStreamRequest {
    pub fn new(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            history: None,
        }
    }

    pub fn with_history(mut self, history: Vec<WireMessage>) -> Self {
        self.history = Some(history);
        self
    }
}

/// Body of `GET /sessions/{id}/messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessagesResponse {
    /// Missing and `null` both read as an empty list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<WireMessage>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<WireMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<WireMessage>>::deserialize(deserializer)?.unwrap_or_default())
}
