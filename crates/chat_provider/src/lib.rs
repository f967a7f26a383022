//! Minimal backend-agnostic contract for one conversational turn.
//!
//! This crate defines only the shared message model, the session identity
//! newtype and the pull-based delta contract consumed by the conversation state
//! machine. It excludes wire formats, HTTP details and transcript ownership.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of one transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Maps a wire role name to a transcript role.
    ///
    /// Accepts the LangChain aliases (`human`, `ai`) some history stores emit.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Self::User),
            "assistant" | "ai" => Some(Self::Assistant),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Opaque identifier correlating a local client with a server-side conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validates and wraps a session identifier.
    ///
    /// Identifiers must be non-empty and free of whitespace and control
    /// characters so they survive use as a single URL path segment.
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidSessionId> {
        let value = value.into();
        if value.is_empty()
            || value
                .chars()
                .any(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(InvalidSessionId { value });
        }

        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returned by [`SessionId::parse`] for unusable identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSessionId {
    pub value: String,
}

impl fmt::Display for InvalidSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid session id: {:?}", self.value)
    }
}

impl std::error::Error for InvalidSessionId {}

/// Whether prior turns travel with each request or live in server-side session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryMode {
    #[default]
    ServerSession,
    Explicit,
}

impl HistoryMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "server" | "session" | "server-session" => Some(Self::ServerSession),
            "explicit" | "history" => Some(Self::Explicit),
            _ => None,
        }
    }
}

/// Input required to open one streaming turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub session_id: SessionId,
    pub message: String,
    /// Prior committed turns, present only for [`HistoryMode::Explicit`].
    pub history: Option<Vec<Message>>,
}

/// How a delta sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The authoritative `done` marker was observed.
    Done,
    /// The transport closed without a `done` marker.
    TransportClosed,
}

impl Termination {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Failure reported by a chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The remote service has no record for the requested session.
    NotFound,
    /// The exchange succeeded but carried no readable body.
    MissingBody,
    Status { status: u16, message: String },
    Transport(String),
    Stream(String),
    Unsupported(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "session not found"),
            Self::MissingBody => write!(f, "no response body"),
            Self::Status { status, message } => write!(f, "API error {status}: {message}"),
            Self::Transport(message) => write!(f, "{message}"),
            Self::Stream(message) => write!(f, "stream interrupted: {message}"),
            Self::Unsupported(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Error returned while constructing a backend, before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInitError {
    message: String,
}

impl BackendInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendInitError {}

impl From<String> for BackendInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Immutable metadata describing a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub backend_id: String,
    pub endpoint: String,
}

/// Lazy, finite, non-restartable sequence of content deltas for one turn.
#[async_trait]
pub trait DeltaSource: Send {
    /// Returns the next delta, or `None` once the sequence has ended.
    ///
    /// After the first `None` every later call also returns `None`.
    async fn next_delta(&mut self) -> Result<Option<String>, BackendError>;

    /// How the sequence ended, once it has.
    fn termination(&self) -> Option<Termination>;
}

/// Remote assistant service operations consumed by the conversation core.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn profile(&self) -> BackendProfile;

    /// Retrieves prior messages for a session in transcript order.
    async fn load_history(&self, session_id: &SessionId) -> Result<Vec<Message>, BackendError>;

    /// Opens a streaming exchange for one user message.
    async fn open_turn(&self, request: TurnRequest)
        -> Result<Box<dyn DeltaSource>, BackendError>;

    /// Deletes the server-side history for a session.
    async fn reset_session(&self, session_id: &SessionId) -> Result<(), BackendError> {
        let _ = session_id;
        Err(BackendError::Unsupported(
            "Session reset is not supported by this backend".to_string(),
        ))
    }
}
