//! Deterministic mock implementation of the shared `chat_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing. It keeps per-session
//! history the way the remote service does, so hydration and reset flows can
//! be exercised offline.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chat_provider::{
    BackendError, BackendProfile, ChatBackend, DeltaSource, Message, SessionId, Termination,
    TurnRequest,
};

/// Stable backend identifier used for explicit startup selection.
pub const MOCK_BACKEND_ID: &str = "mock";

const MOCK_ENDPOINT: &str = "memory://mock";

/// One scripted response to `open_turn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedTurn {
    /// Streams `deltas`, then ends with `termination`.
    Reply {
        deltas: Vec<String>,
        termination: Termination,
    },
    /// Fails before any delta is produced.
    FailOpen(BackendError),
    /// Streams `deltas`, then fails with `error`.
    FailMidStream {
        deltas: Vec<String>,
        error: BackendError,
    },
}

impl ScriptedTurn {
    #[must_use]
    pub fn reply<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Reply {
            deltas: deltas.into_iter().map(Into::into).collect(),
            termination: Termination::Done,
        }
    }

    /// Reply whose transport closes without the `done` marker.
    #[must_use]
    pub fn unterminated<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Reply {
            deltas: deltas.into_iter().map(Into::into).collect(),
            termination: Termination::TransportClosed,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::unterminated(Vec::<String>::new())
    }

    #[must_use]
    pub fn fail_open(error: BackendError) -> Self {
        Self::FailOpen(error)
    }

    #[must_use]
    pub fn fail_after<I, S>(deltas: I, error: BackendError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FailMidStream {
            deltas: deltas.into_iter().map(Into::into).collect(),
            error,
        }
    }
}

type Histories = Arc<Mutex<HashMap<SessionId, Vec<Message>>>>;

/// Deterministic mock backend used by `cafe_chat` tests and local runs.
///
/// Scripted turns are consumed in order; once the script runs out every turn
/// streams the fallback reply.
#[derive(Debug)]
pub struct MockBackend {
    script: Mutex<VecDeque<ScriptedTurn>>,
    fallback: Vec<String>,
    histories: Histories,
    requests: Mutex<Vec<TurnRequest>>,
    history_error: Mutex<Option<BackendError>>,
    delta_delay: Option<Duration>,
}

impl MockBackend {
    /// Creates a mock whose every turn streams `chunks` split into word tokens.
    #[must_use]
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: tokenize(&chunks),
            histories: Arc::new(Mutex::new(HashMap::new())),
            requests: Mutex::new(Vec::new()),
            history_error: Mutex::new(None),
            delta_delay: None,
        }
    }

    /// Creates a mock that plays `turns` in order before falling back to silence.
    #[must_use]
    pub fn scripted(turns: Vec<ScriptedTurn>) -> Self {
        let backend = Self::new(Vec::new());
        lock_unpoisoned(&backend.script).extend(turns);
        backend
    }

    /// Sleeps between deltas so interactive runs visibly stream.
    #[must_use]
    pub fn with_delta_delay(mut self, delay: Duration) -> Self {
        self.delta_delay = Some(delay);
        self
    }

    /// Seeds stored history for `session_id`.
    #[must_use]
    pub fn with_history(self, session_id: SessionId, messages: Vec<Message>) -> Self {
        lock_unpoisoned(&self.histories).insert(session_id, messages);
        self
    }

    /// Makes every later `load_history` call fail with `error`.
    pub fn fail_history(&self, error: BackendError) {
        *lock_unpoisoned(&self.history_error) = Some(error);
    }

    /// Requests seen by `open_turn`, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<TurnRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    /// Stored history for `session_id`, if the session exists.
    #[must_use]
    pub fn stored_history(&self, session_id: &SessionId) -> Option<Vec<Message>> {
        lock_unpoisoned(&self.histories).get(session_id).cloned()
    }

    fn next_turn(&self) -> ScriptedTurn {
        lock_unpoisoned(&self.script)
            .pop_front()
            .unwrap_or_else(|| ScriptedTurn::reply(self.fallback.clone()))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(vec![
            "Welcome to the cafe counter! ".to_string(),
            "Today we are pouring a single-origin pour-over, ".to_string(),
            "a honey oat latte and a classic cortado.\n".to_string(),
            "\n".to_string(),
            "- Pastries: almond croissant, cardamom bun.\n".to_string(),
            "- Ask about decaf and milk alternatives.\n".to_string(),
            "\n".to_string(),
            "What can I get started for you?".to_string(),
        ])
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: MOCK_BACKEND_ID.to_string(),
            endpoint: MOCK_ENDPOINT.to_string(),
        }
    }

    async fn load_history(&self, session_id: &SessionId) -> Result<Vec<Message>, BackendError> {
        if let Some(error) = lock_unpoisoned(&self.history_error).clone() {
            return Err(error);
        }

        lock_unpoisoned(&self.histories)
            .get(session_id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn open_turn(
        &self,
        request: TurnRequest,
    ) -> Result<Box<dyn DeltaSource>, BackendError> {
        lock_unpoisoned(&self.requests).push(request.clone());

        let (deltas, ending) = match self.next_turn() {
            ScriptedTurn::FailOpen(error) => return Err(error),
            ScriptedTurn::Reply {
                deltas,
                termination,
            } => (deltas, Ok(termination)),
            ScriptedTurn::FailMidStream { deltas, error } => (deltas, Err(error)),
        };

        Ok(Box::new(MockDeltaSource {
            deltas: deltas.into(),
            ending: Some(ending),
            termination: None,
            produced: String::new(),
            request,
            histories: Arc::clone(&self.histories),
            delay: self.delta_delay,
        }))
    }

    async fn reset_session(&self, session_id: &SessionId) -> Result<(), BackendError> {
        lock_unpoisoned(&self.histories).remove(session_id);
        Ok(())
    }
}

struct MockDeltaSource {
    deltas: VecDeque<String>,
    ending: Option<Result<Termination, BackendError>>,
    termination: Option<Termination>,
    produced: String,
    request: TurnRequest,
    histories: Histories,
    delay: Option<Duration>,
}

impl MockDeltaSource {
    /// Stores the finished exchange the way the service persists a turn.
    fn record_exchange(&mut self) {
        if self.produced.is_empty() {
            return;
        }

        let mut histories = lock_unpoisoned(&self.histories);
        let history = histories
            .entry(self.request.session_id.clone())
            .or_default();
        history.push(Message::user(self.request.message.clone()));
        history.push(Message::assistant(std::mem::take(&mut self.produced)));
    }
}

#[async_trait]
impl DeltaSource for MockDeltaSource {
    async fn next_delta(&mut self) -> Result<Option<String>, BackendError> {
        if let Some(delta) = self.deltas.pop_front() {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.produced.push_str(&delta);
            return Ok(Some(delta));
        }

        match self.ending.take() {
            Some(Ok(termination)) => {
                self.termination = Some(termination);
                self.record_exchange();
                Ok(None)
            }
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }

    fn termination(&self) -> Option<Termination> {
        self.termination
    }
}

/// Splits chunks into word-sized deltas, keeping the trailing separator.
fn tokenize(chunks: &[String]) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in chunks {
        let mut pending = String::new();
        for ch in chunk.chars() {
            pending.push(ch);
            if matches!(ch, ' ' | '\n') {
                tokens.push(std::mem::take(&mut pending));
            }
        }
        if !pending.is_empty() {
            tokens.push(pending);
        }
    }
    tokens
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
