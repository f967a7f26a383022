use chat_api::error::parse_error_message;
use chat_api::ChatApiError;
use reqwest::StatusCode;

#[test]
fn detail_string_is_preferred() {
    let message = parse_error_message(
        StatusCode::UNPROCESSABLE_ENTITY,
        r#"{"detail":"message must not be empty"}"#,
    );
    assert_eq!(message, "message must not be empty");
}

#[test]
fn structured_detail_is_rendered_as_json() {
    let message = parse_error_message(StatusCode::BAD_REQUEST, r#"{"detail":[{"loc":"body"}]}"#);
    assert_eq!(message, r#"[{"loc":"body"}]"#);
}

#[test]
fn error_object_message_is_used() {
    let message = parse_error_message(
        StatusCode::SERVICE_UNAVAILABLE,
        r#"{"error":{"message":"barista on break"}}"#,
    );
    assert_eq!(message, "barista on break");
}

#[test]
fn raw_body_is_used_when_not_json() {
    let message = parse_error_message(StatusCode::BAD_GATEWAY, "  upstream down \n");
    assert_eq!(message, "upstream down");
}

#[test]
fn empty_body_falls_back_to_reason_phrase() {
    let message = parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, "");
    assert_eq!(message, "Internal Server Error");
}

#[test]
fn display_strings_are_stable() {
    assert_eq!(ChatApiError::NotFound.to_string(), "session not found");
    assert_eq!(ChatApiError::MissingBody.to_string(), "No response body");
    assert_eq!(
        ChatApiError::Status(StatusCode::BAD_REQUEST, "bad".to_owned()).to_string(),
        "API error: 400 Bad Request bad"
    );
}
