//! HTTP-backed implementation of the shared `chat_provider` contract.
//!
//! This adapter translates `chat_api` transport results into the
//! backend-neutral types the conversation core consumes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chat_api::{
    ChatApiClient, ChatApiConfig, ChatApiError, ChatStreamRequest, DeltaStream,
    StreamTermination, WireMessage,
};
use chat_provider::{
    BackendError, BackendInitError, BackendProfile, ChatBackend, DeltaSource, Message, Role,
    SessionId, Termination, TurnRequest,
};
use tracing::debug;

/// Stable backend identifier used by `cafe_chat` startup selection.
pub const HTTP_BACKEND_ID: &str = "http";

/// Runtime configuration for the HTTP backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpBackendConfig {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
    /// Extra headers sent with every request, applied after the defaults.
    pub headers: Vec<(String, String)>,
}

impl HttpBackendConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn into_chat_api_config(self) -> ChatApiConfig {
        let mut config = ChatApiConfig::default();

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        for (name, value) in self.headers {
            config = config.insert_header(name, value);
        }

        config
    }
}

#[async_trait]
trait ChatTransport: Send + Sync {
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<DeltaStream, ChatApiError>;

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<WireMessage>, ChatApiError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), ChatApiError>;
}

#[async_trait]
impl ChatTransport for ChatApiClient {
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<DeltaStream, ChatApiError> {
        ChatApiClient::open_stream(self, request).await
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<WireMessage>, ChatApiError> {
        ChatApiClient::fetch_history(self, session_id).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ChatApiError> {
        ChatApiClient::delete_session(self, session_id).await
    }
}

/// `ChatBackend` adapter backed by `chat_api` transport primitives.
pub struct HttpBackend {
    endpoint: String,
    transport: Arc<dyn ChatTransport>,
}

impl HttpBackend {
    /// Creates a backend using real HTTP transport.
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendInitError> {
        let client = ChatApiClient::new(config.into_chat_api_config()).map_err(map_init_error)?;

        Ok(Self {
            endpoint: client.base_url(),
            transport: Arc::new(client),
        })
    }

    #[cfg(test)]
    fn with_transport_for_tests(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            endpoint: "http://test.invalid".to_string(),
            transport,
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: HTTP_BACKEND_ID.to_string(),
            endpoint: self.endpoint.clone(),
        }
    }

    async fn load_history(&self, session_id: &SessionId) -> Result<Vec<Message>, BackendError> {
        let wire = self
            .transport
            .fetch_history(session_id.as_str())
            .await
            .map_err(map_request_error)?;
        Ok(messages_from_wire(wire))
    }

    async fn open_turn(
        &self,
        request: TurnRequest,
    ) -> Result<Box<dyn DeltaSource>, BackendError> {
        let stream = self
            .transport
            .open_stream(&stream_request(request))
            .await
            .map_err(map_request_error)?;
        Ok(Box::new(DeltaStreamSource::new(stream)))
    }

    async fn reset_session(&self, session_id: &SessionId) -> Result<(), BackendError> {
        match self.transport.delete_session(session_id.as_str()).await {
            Ok(()) | Err(ChatApiError::NotFound) => Ok(()),
            Err(error) => Err(map_request_error(error)),
        }
    }
}

/// [`DeltaSource`] over a decoded response body.
#[derive(Debug)]
pub struct DeltaStreamSource {
    stream: DeltaStream,
}

impl DeltaStreamSource {
    #[must_use]
    pub fn new(stream: DeltaStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl DeltaSource for DeltaStreamSource {
    async fn next_delta(&mut self) -> Result<Option<String>, BackendError> {
        self.stream
            .next_delta()
            .await
            .map_err(|error| BackendError::Stream(error.to_string()))
    }

    fn termination(&self) -> Option<Termination> {
        self.stream.termination().map(|termination| match termination {
            StreamTermination::Done => Termination::Done,
            StreamTermination::TransportClosed => Termination::TransportClosed,
        })
    }
}

fn stream_request(request: TurnRequest) -> ChatStreamRequest {
    let payload = ChatStreamRequest::new(request.message, request.session_id.into_string());
    match request.history {
        Some(history) => payload.with_history(
            history
                .into_iter()
                .map(|message| WireMessage::new(message.role.as_str(), message.content))
                .collect(),
        ),
        None => payload,
    }
}

fn messages_from_wire(wire: Vec<WireMessage>) -> Vec<Message> {
    wire.into_iter()
        .filter_map(|message| match Role::parse(&message.role) {
            Some(role) => Some(Message {
                role,
                content: message.content,
            }),
            None => {
                debug!(role = %message.role, "skipping history entry with unknown role");
                None
            }
        })
        .collect()
}

fn map_request_error(error: ChatApiError) -> BackendError {
    match error {
        ChatApiError::NotFound => BackendError::NotFound,
        ChatApiError::MissingBody => BackendError::MissingBody,
        ChatApiError::Status(status, message) => BackendError::Status {
            status: status.as_u16(),
            message,
        },
        ChatApiError::Serde(error) => {
            BackendError::Transport(format!("invalid response body: {error}"))
        }
        other => BackendError::Transport(other.to_string()),
    }
}

fn map_init_error(error: ChatApiError) -> BackendInitError {
    BackendInitError::new(format!("Failed to initialize http backend: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use reqwest::StatusCode;

    use super::*;

    #[derive(Default)]
    struct FakeTransport {
        observed: Mutex<Vec<ChatStreamRequest>>,
        chunks: Mutex<Option<Vec<&'static str>>>,
        open_error: Mutex<Option<ChatApiError>>,
        history: Mutex<Option<Result<Vec<WireMessage>, ChatApiError>>>,
        delete_error: Mutex<Option<ChatApiError>>,
    }

    impl FakeTransport {
        fn streaming(chunks: Vec<&'static str>) -> Arc<Self> {
            let fake = Self::default();
            *lock(&fake.chunks) = Some(chunks);
            Arc::new(fake)
        }

        fn failing_open(error: ChatApiError) -> Arc<Self> {
            let fake = Self::default();
            *lock(&fake.open_error) = Some(error);
            Arc::new(fake)
        }

        fn with_history(result: Result<Vec<WireMessage>, ChatApiError>) -> Arc<Self> {
            let fake = Self::default();
            *lock(&fake.history) = Some(result);
            Arc::new(fake)
        }

        fn failing_delete(error: ChatApiError) -> Arc<Self> {
            let fake = Self::default();
            *lock(&fake.delete_error) = Some(error);
            Arc::new(fake)
        }

        fn observed(&self) -> Vec<ChatStreamRequest> {
            lock(&self.observed).clone()
        }
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn open_stream(
            &self,
            request: &ChatStreamRequest,
        ) -> Result<DeltaStream, ChatApiError> {
            lock(&self.observed).push(request.clone());
            if let Some(error) = lock(&self.open_error).take() {
                return Err(error);
            }
            let chunks = lock(&self.chunks).take().unwrap_or_default();
            Ok(DeltaStream::from_chunks(chunks))
        }

        async fn fetch_history(&self, _session_id: &str) -> Result<Vec<WireMessage>, ChatApiError> {
            lock(&self.history).take().unwrap_or(Ok(Vec::new()))
        }

        async fn delete_session(&self, _session_id: &str) -> Result<(), ChatApiError> {
            match lock(&self.delete_error).take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().expect("fake transport lock")
    }

    fn session() -> SessionId {
        SessionId::parse("sess-1").expect("valid session id")
    }

    fn turn(message: &str, history: Option<Vec<Message>>) -> TurnRequest {
        TurnRequest {
            session_id: session(),
            message: message.to_string(),
            history,
        }
    }

    #[test]
    fn profile_reports_http_backend_id_and_endpoint() {
        let backend = HttpBackend::new(
            HttpBackendConfig::new().with_base_url("http://cafe.local:9000/"),
        )
        .expect("backend");

        let profile = backend.profile();
        assert_eq!(profile.backend_id, HTTP_BACKEND_ID);
        assert_eq!(profile.endpoint, "http://cafe.local:9000");
    }

    #[test]
    fn configured_headers_reach_the_transport_config() {
        let config = HttpBackendConfig::new()
            .with_header("X-Cafe-Location", "harbour")
            .with_header("Authorization", "Bearer latte")
            .into_chat_api_config();

        assert_eq!(
            config.extra_headers.get("X-Cafe-Location").map(String::as_str),
            Some("harbour")
        );
        assert_eq!(config.extra_headers.len(), 2);
        HttpBackend::new(HttpBackendConfig::new().with_header("X-Cafe-Location", "harbour"))
            .expect("backend with extra header");
    }

    #[tokio::test]
    async fn open_turn_streams_decoded_deltas_and_done() {
        let fake = FakeTransport::streaming(vec!["data: Hel\n\ndata: lo\n\n", "event: done\n\n"]);
        let backend = HttpBackend::with_transport_for_tests(fake.clone());

        let mut source = backend.open_turn(turn("hi", None)).await.expect("open");
        let mut deltas = Vec::new();
        while let Some(delta) = source.next_delta().await.expect("delta") {
            deltas.push(delta);
        }

        assert_eq!(deltas, vec!["Hel", "lo"]);
        assert_eq!(source.termination(), Some(Termination::Done));
        assert_eq!(fake.observed(), vec![ChatStreamRequest::new("hi", "sess-1")]);
    }

    #[tokio::test]
    async fn explicit_history_is_forwarded_on_the_wire() {
        let fake = FakeTransport::streaming(vec!["data: ok\n\n"]);
        let backend = HttpBackend::with_transport_for_tests(fake.clone());

        let history = vec![Message::user("latte"), Message::assistant("sure")];
        let mut source = backend
            .open_turn(turn("and a scone", Some(history)))
            .await
            .expect("open");
        assert_eq!(source.next_delta().await.expect("delta").as_deref(), Some("ok"));
        assert_eq!(source.next_delta().await.expect("end"), None);
        assert_eq!(source.termination(), Some(Termination::TransportClosed));

        let observed = fake.observed();
        assert_eq!(
            observed[0].history,
            Some(vec![
                WireMessage::new("user", "latte"),
                WireMessage::new("assistant", "sure")
            ])
        );
    }

    #[tokio::test]
    async fn open_failures_map_to_backend_errors() {
        let backend = HttpBackend::with_transport_for_tests(FakeTransport::failing_open(
            ChatApiError::Status(StatusCode::BAD_GATEWAY, "upstream down".to_string()),
        ));
        let error = backend.open_turn(turn("hi", None)).await.err();
        assert_eq!(
            error,
            Some(BackendError::Status {
                status: 502,
                message: "upstream down".to_string()
            })
        );

        let backend = HttpBackend::with_transport_for_tests(FakeTransport::failing_open(
            ChatApiError::MissingBody,
        ));
        assert_eq!(
            backend.open_turn(turn("hi", None)).await.err(),
            Some(BackendError::MissingBody)
        );
    }

    #[tokio::test]
    async fn history_roles_are_mapped_and_unknown_roles_skipped() {
        let backend = HttpBackend::with_transport_for_tests(FakeTransport::with_history(Ok(vec![
            WireMessage::new("human", "hi"),
            WireMessage::new("system", "hidden"),
            WireMessage::new("ai", "hello"),
        ])));

        assert_eq!(
            backend.load_history(&session()).await.expect("history"),
            vec![Message::user("hi"), Message::assistant("hello")]
        );
    }

    #[tokio::test]
    async fn missing_history_maps_to_not_found() {
        let backend = HttpBackend::with_transport_for_tests(FakeTransport::with_history(Err(
            ChatApiError::NotFound,
        )));

        assert_eq!(
            backend.load_history(&session()).await.err(),
            Some(BackendError::NotFound)
        );
    }

    #[tokio::test]
    async fn reset_of_unknown_session_succeeds() {
        let backend = HttpBackend::with_transport_for_tests(FakeTransport::failing_delete(
            ChatApiError::NotFound,
        ));
        backend.reset_session(&session()).await.expect("reset");

        let backend = HttpBackend::with_transport_for_tests(FakeTransport::failing_delete(
            ChatApiError::Unknown("boom".to_string()),
        ));
        assert_eq!(
            backend.reset_session(&session()).await.err(),
            Some(BackendError::Transport("boom".to_string()))
        );
    }
}
