use chat_api::url::{session_messages_url, session_url, stream_url};
use chat_api::{normalize_base_url, ChatApiError, DEFAULT_CHAT_BASE_URL};

#[test]
fn blank_base_url_falls_back_to_default() {
    assert_eq!(normalize_base_url("  "), DEFAULT_CHAT_BASE_URL);
}

#[test]
fn trailing_slashes_are_trimmed() {
    assert_eq!(
        normalize_base_url("http://cafe.local:9000/api//"),
        "http://cafe.local:9000/api"
    );
}

#[test]
fn stream_endpoint_appends_chat_stream() {
    let url = stream_url("http://localhost:8000/").expect("url");
    assert_eq!(url.as_str(), "http://localhost:8000/chat/stream");
}

#[test]
fn endpoints_keep_base_path_prefix() {
    let url = session_messages_url("https://cafe.example/api", "abc").expect("url");
    assert_eq!(url.as_str(), "https://cafe.example/api/sessions/abc/messages");
}

#[test]
fn session_id_is_percent_encoded_as_one_segment() {
    let url = session_url("http://localhost:8000", "a/b c").expect("url");
    assert_eq!(url.as_str(), "http://localhost:8000/sessions/a%2Fb%20c");
}

#[test]
fn unparseable_base_url_is_rejected() {
    let error = stream_url("not a url").expect_err("invalid");
    assert!(matches!(error, ChatApiError::InvalidBaseUrl(_)));
}
