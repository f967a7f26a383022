use url::Url;

use crate::error::ChatApiError;

/// Default base URL of the chat service.
pub const DEFAULT_CHAT_BASE_URL: &str = "http://localhost:8000";

const STREAM_PATH: [&str; 2] = ["chat", "stream"];
const SESSIONS_SEGMENT: &str = "sessions";
const MESSAGES_SEGMENT: &str = "messages";

/// Normalize a configured base URL.
///
/// Blank input falls back to [`DEFAULT_CHAT_BASE_URL`]; trailing slashes are
/// dropped so endpoint segments append cleanly.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

/// `POST {base}/chat/stream`
pub fn stream_url(base_url: &str) -> Result<Url, ChatApiError> {
    endpoint(base_url, &STREAM_PATH)
}

/// `GET {base}/sessions/{id}/messages`
pub fn session_messages_url(base_url: &str, session_id: &str) -> Result<Url, ChatApiError> {
    endpoint(base_url, &[SESSIONS_SEGMENT, session_id, MESSAGES_SEGMENT])
}

/// `DELETE {base}/sessions/{id}`
pub fn session_url(base_url: &str, session_id: &str) -> Result<Url, ChatApiError> {
    endpoint(base_url, &[SESSIONS_SEGMENT, session_id])
}

/// Appends path segments, percent-encoding each one.
fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url, ChatApiError> {
    let normalized = normalize_base_url(base_url);
    let mut url = Url::parse(&normalized)
        .map_err(|error| ChatApiError::InvalidBaseUrl(format!("{normalized}: {error}")))?;

    url.path_segments_mut()
        .map_err(|()| ChatApiError::InvalidBaseUrl(format!("{normalized}: cannot be a base")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
