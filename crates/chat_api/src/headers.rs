use std::collections::BTreeMap;

use crate::config::ChatApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_USER_AGENT: &str = "user-agent";

pub const ACCEPT_EVENT_STREAM: &str = "text/event-stream";
pub const ACCEPT_JSON: &str = "application/json";

/// Build a deterministic header map for chat service requests.
///
/// `accept` is chosen per endpoint; configured extra headers are lowercased
/// and applied last.
pub fn build_headers(config: &ChatApiConfig, accept: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), accept.to_owned());

    let user_agent = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent);

    for (key, value) in &config.extra_headers {
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        headers.insert(key, value.trim().to_owned());
    }

    headers
}

fn default_user_agent() -> String {
    format!(
        "cafe_chat/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_headers_are_lowercased_and_override_defaults() {
        let config = ChatApiConfig::default()
            .insert_header("X-Trace", " abc ")
            .insert_header("Accept", "text/plain");

        let headers = build_headers(&config, ACCEPT_EVENT_STREAM);

        assert_eq!(headers.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(headers.get(HEADER_ACCEPT).map(String::as_str), Some("text/plain"));
    }

    #[test]
    fn blank_user_agent_falls_back_to_default() {
        let config = ChatApiConfig::default().with_user_agent("   ");
        let headers = build_headers(&config, ACCEPT_JSON);

        assert!(headers
            .get(HEADER_USER_AGENT)
            .is_some_and(|value| value.starts_with("cafe_chat/")));
    }
}
