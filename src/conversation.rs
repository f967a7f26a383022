//! Conversation state machine: optimistic turns with commit or rollback.
//!
//! A turn opens by appending the user prompt and an empty reply placeholder,
//! streams deltas into the placeholder, then either commits both entries or
//! removes what it added. The transcript has a single writer; presentation
//! layers observe it through [`TurnEvent`] callbacks and accessors.

use std::sync::Arc;

use chat_provider::{ChatBackend, HistoryMode, SessionId, Termination, TurnRequest};
use session_store::IdentityProvider;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::hydrate::HistoryHydrator;
use crate::transcript::Transcript;

pub const EMPTY_REPLY_ERROR: &str = "No response received from the assistant";
pub const INTERRUPTED_ERROR: &str = "Request interrupted before the reply finished";

/// What a failed turn removes from the transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RollbackPolicy {
    /// Remove both the user prompt and the reply placeholder.
    #[default]
    RemoveTurn,
    /// Remove only the placeholder; the prompt stays committed.
    RemoveReply,
}

impl RollbackPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "turn" | "strict" | "both" => Some(Self::RemoveTurn),
            "reply" | "placeholder" => Some(Self::RemoveReply),
            _ => None,
        }
    }

    fn keeps_prompt(self) -> bool {
        matches!(self, Self::RemoveReply)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationOptions {
    pub history_mode: HistoryMode,
    pub rollback_policy: RollbackPolicy,
}

/// Boundary rejections. Everything that goes wrong inside a turn lands in
/// the error slot instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a reply is still streaming")]
    Busy,
    #[error("session identity unavailable: {0}")]
    Identity(String),
}

/// Terminal state of one `send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Committed { termination: Termination },
    RolledBack { reason: String },
}

impl TurnOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Notification delivered after each transcript mutation of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent<'a> {
    /// Prompt and empty placeholder were appended.
    Opened,
    /// A delta was appended to the placeholder.
    Delta(&'a str),
    Committed(Termination),
    RolledBack(&'a str),
}

pub struct Conversation {
    backend: Arc<dyn ChatBackend>,
    identity: Arc<dyn IdentityProvider>,
    options: ConversationOptions,
    transcript: Transcript,
    last_error: Option<String>,
}

impl Conversation {
    pub fn new(backend: Arc<dyn ChatBackend>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_options(backend, identity, ConversationOptions::default())
    }

    pub fn with_options(
        backend: Arc<dyn ChatBackend>,
        identity: Arc<dyn IdentityProvider>,
        options: ConversationOptions,
    ) -> Self {
        Self {
            backend,
            identity,
            options,
            transcript: Transcript::new(),
            last_error: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.transcript.is_open()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Replaces the committed transcript with server-held history.
    ///
    /// Returns the number of messages loaded. Failures degrade to an empty
    /// transcript and never touch the error slot.
    pub async fn hydrate(&mut self) -> usize {
        if self.is_busy() {
            debug!("skipping hydration while a turn is open");
            return 0;
        }

        let messages = match self.identity.get_identity() {
            Ok(session_id) => {
                HistoryHydrator::new(Arc::clone(&self.backend))
                    .load(&session_id)
                    .await
            }
            Err(error) => {
                warn!(%error, "session identity unavailable; starting empty");
                Vec::new()
            }
        };

        let loaded = messages.len();
        self.transcript.replace(messages);
        loaded
    }

    /// Switches to a known session and replaces the transcript with its history.
    ///
    /// Returns the number of messages loaded. Refused while a turn is open.
    pub async fn resume(&mut self, session_id: SessionId) -> Result<usize, ConversationError> {
        if self.is_busy() {
            return Err(ConversationError::Busy);
        }
        self.identity
            .adopt(session_id)
            .map_err(|error| ConversationError::Identity(error.to_string()))?;
        self.last_error = None;
        Ok(self.hydrate().await)
    }

    pub async fn send(&mut self, input: &str) -> Result<TurnOutcome, ConversationError> {
        self.send_with(input, |_, _| {}).await
    }

    /// Runs one turn, calling `on_event` after every transcript mutation.
    ///
    /// Only boundary rejections are returned as errors. Dropping the returned
    /// future mid-turn rolls the open turn back.
    pub async fn send_with<F>(
        &mut self,
        input: &str,
        mut on_event: F,
    ) -> Result<TurnOutcome, ConversationError>
    where
        F: FnMut(TurnEvent<'_>, &Transcript),
    {
        if self.is_busy() {
            return Err(ConversationError::Busy);
        }
        if input.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        self.last_error = None;
        let history = match self.options.history_mode {
            HistoryMode::Explicit => Some(self.transcript.messages().to_vec()),
            HistoryMode::ServerSession => None,
        };
        self.transcript.open(input.to_string());

        let mut turn = TurnGuard { conversation: self };
        on_event(TurnEvent::Opened, &turn.conversation.transcript);

        let outcome = match turn.stream(input, history, &mut on_event).await {
            Ok(termination) => {
                turn.commit(termination);
                on_event(
                    TurnEvent::Committed(termination),
                    &turn.conversation.transcript,
                );
                TurnOutcome::Committed { termination }
            }
            Err(reason) => {
                turn.rollback(&reason);
                on_event(TurnEvent::RolledBack(&reason), &turn.conversation.transcript);
                TurnOutcome::RolledBack { reason }
            }
        };

        Ok(outcome)
    }

    /// Empties the transcript and the error slot. Refused while a turn is open.
    pub fn reset(&mut self) -> Result<(), ConversationError> {
        if self.is_busy() {
            return Err(ConversationError::Busy);
        }
        self.transcript.replace(Vec::new());
        self.last_error = None;
        Ok(())
    }

    fn rollback_open_turn(&mut self, reason: &str) {
        if self
            .transcript
            .rollback(self.options.rollback_policy.keeps_prompt())
        {
            warn!(reason, "turn rolled back");
            self.last_error = Some(reason.to_string());
        }
    }
}

/// Holds the conversation for the duration of one open turn.
///
/// If the turn is still open when the guard drops, the send future was
/// abandoned mid-stream and the turn is rolled back.
struct TurnGuard<'a> {
    conversation: &'a mut Conversation,
}

impl TurnGuard<'_> {
    async fn stream<F>(
        &mut self,
        input: &str,
        history: Option<Vec<chat_provider::Message>>,
        on_event: &mut F,
    ) -> Result<Termination, String>
    where
        F: FnMut(TurnEvent<'_>, &Transcript),
    {
        let conversation = &mut *self.conversation;
        let session_id = conversation
            .identity
            .get_identity()
            .map_err(|error| format!("Session identity unavailable: {error}"))?;

        let request = TurnRequest {
            session_id,
            message: input.to_string(),
            history,
        };
        let mut source = conversation
            .backend
            .open_turn(request)
            .await
            .map_err(|error| error.to_string())?;
        debug!("reply stream opened");

        let mut accumulated = String::new();
        while let Some(delta) = source.next_delta().await.map_err(|error| error.to_string())? {
            if delta.is_empty() {
                continue;
            }
            accumulated.push_str(&delta);
            conversation.transcript.set_reply(&accumulated);
            on_event(TurnEvent::Delta(&delta), &conversation.transcript);
        }

        if accumulated.is_empty() {
            return Err(EMPTY_REPLY_ERROR.to_string());
        }

        Ok(source.termination().unwrap_or(Termination::TransportClosed))
    }

    fn commit(&mut self, termination: Termination) {
        if !self.conversation.transcript.commit() {
            return;
        }
        if termination.is_clean() {
            info!("turn committed");
        } else {
            warn!("turn committed but the stream closed without a done marker");
        }
    }

    fn rollback(&mut self, reason: &str) {
        self.conversation.rollback_open_turn(reason);
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.conversation.transcript.is_open() {
            self.conversation.rollback_open_turn(INTERRUPTED_ERROR);
        }
    }
}
