//! Startup retrieval of server-held history.

use std::sync::Arc;

use chat_provider::{BackendError, ChatBackend, Message, SessionId};
use tracing::{debug, warn};

/// Loads prior messages for a session, degrading every failure to "no history".
#[derive(Clone)]
pub struct HistoryHydrator {
    backend: Arc<dyn ChatBackend>,
}

impl HistoryHydrator {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Issues one retrieval; never fails and never retries.
    pub async fn load(&self, session_id: &SessionId) -> Vec<Message> {
        match self.backend.load_history(session_id).await {
            Ok(messages) => {
                debug!(%session_id, messages = messages.len(), "hydrated history");
                messages
            }
            Err(BackendError::NotFound) => {
                debug!(%session_id, "no stored history for session");
                Vec::new()
            }
            Err(error) => {
                warn!(%session_id, %error, "history retrieval failed; starting empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chat_provider_mock::MockBackend;
    use pretty_assertions::assert_eq;

    use super::*;

    fn session() -> SessionId {
        SessionId::parse("hydrate-test").expect("valid session id")
    }

    #[tokio::test]
    async fn unknown_session_yields_empty_history() {
        let hydrator = HistoryHydrator::new(Arc::new(MockBackend::default()));
        assert_eq!(hydrator.load(&session()).await, Vec::new());
    }

    #[tokio::test]
    async fn stored_history_is_returned_in_order() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let backend = MockBackend::default().with_history(session(), messages.clone());
        let hydrator = HistoryHydrator::new(Arc::new(backend));

        assert_eq!(hydrator.load(&session()).await, messages);
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_empty() {
        let backend = MockBackend::default();
        backend.fail_history(BackendError::Transport("connection refused".to_string()));
        let hydrator = HistoryHydrator::new(Arc::new(backend));

        assert!(hydrator.load(&session()).await.is_empty());
    }
}
