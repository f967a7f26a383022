use chat_api::{ChatStreamRequest, SessionMessagesResponse, WireMessage};
use serde_json::json;

#[test]
fn stream_request_omits_history_by_default() {
    let request = ChatStreamRequest::new("One latte please", "sess-1");
    let value = serde_json::to_value(&request).expect("serialize");

    assert_eq!(
        value,
        json!({"message": "One latte please", "session_id": "sess-1"})
    );
}

#[test]
fn stream_request_carries_explicit_history() {
    let request = ChatStreamRequest::new("And a croissant", "sess-1").with_history(vec![
        WireMessage::new("user", "One latte please"),
        WireMessage::new("assistant", "Coming up."),
    ]);
    let value = serde_json::to_value(&request).expect("serialize");

    assert_eq!(value["history"][1]["role"], "assistant");
    assert_eq!(value["history"].as_array().map(Vec::len), Some(2));
}

#[test]
fn session_messages_tolerate_missing_list() {
    let empty: SessionMessagesResponse = serde_json::from_str("{}").expect("parse");
    assert!(empty.messages.is_empty());

    let null: SessionMessagesResponse =
        serde_json::from_str(r#"{"messages":null}"#).expect("null list should parse");
    assert!(null.messages.is_empty());

    let full: SessionMessagesResponse = serde_json::from_str(
        r#"{"messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}],"session_id":"x"}"#,
    )
    .expect("parse");
    assert_eq!(full.messages[1], WireMessage::new("assistant", "hello"));
}
