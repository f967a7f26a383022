use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::{build_headers, ACCEPT_EVENT_STREAM, ACCEPT_JSON};
use crate::payload::{ChatStreamRequest, SessionMessagesResponse, WireMessage};
use crate::stream::DeltaStream;
use crate::url::{normalize_base_url, session_messages_url, session_url, stream_url};

#[derive(Debug, Clone)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> String {
        normalize_base_url(&self.config.base_url)
    }

    pub fn header_map(&self, accept: &str) -> Result<HeaderMap, ChatApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config, accept) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_stream_request(
        &self,
        request: &ChatStreamRequest,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let url = stream_url(&self.config.base_url)?;
        Ok(self
            .http
            .post(url)
            .headers(self.header_map(ACCEPT_EVENT_STREAM)?)
            .json(request))
    }

    /// Submits one turn and returns the lazily decoded reply.
    ///
    /// Nothing of the body is read before the first
    /// [`DeltaStream::next_delta`] call.
    pub async fn open_stream(
        &self,
        request: &ChatStreamRequest,
    ) -> Result<DeltaStream, ChatApiError> {
        debug!(
            session_id = %request.session_id,
            explicit_history = request.history.is_some(),
            "opening chat stream"
        );
        let response = self.build_stream_request(request)?.send().await?;
        let response = ensure_success(response).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Err(ChatApiError::MissingBody);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ChatApiError::from));
        Ok(DeltaStream::new(body))
    }

    /// Fetches the stored messages of a session.
    pub async fn fetch_history(&self, session_id: &str) -> Result<Vec<WireMessage>, ChatApiError> {
        let url = session_messages_url(&self.config.base_url, session_id)?;
        let response = self
            .http
            .get(url)
            .headers(self.header_map(ACCEPT_JSON)?)
            .send()
            .await?;
        let response = ensure_session_success(response).await?;
        let body = response.bytes().await?;
        let payload: SessionMessagesResponse = serde_json::from_slice(&body)?;
        debug!(
            session_id,
            messages = payload.messages.len(),
            "fetched session history"
        );
        Ok(payload.messages)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), ChatApiError> {
        let url = session_url(&self.config.base_url, session_id)?;
        let response = self
            .http
            .delete(url)
            .headers(self.header_map(ACCEPT_JSON)?)
            .send()
            .await?;
        ensure_session_success(response).await?;
        debug!(session_id, "deleted remote session");
        Ok(())
    }
}

/// Like [`ensure_success`], but a 404 means the session itself is unknown.
async fn ensure_session_success(response: Response) -> Result<Response, ChatApiError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(ChatApiError::NotFound);
    }
    ensure_success(response).await
}

async fn ensure_success(response: Response) -> Result<Response, ChatApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(ChatApiError::Status(status, parse_error_message(status, &body)))
}
