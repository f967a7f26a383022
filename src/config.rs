//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use chat_api::DEFAULT_CHAT_BASE_URL;
use chat_provider::{HistoryMode, SessionId};
use clap::Parser;
use thiserror::Error;

use crate::conversation::{ConversationOptions, RollbackPolicy};

pub const STATE_DIR_NAME: &str = "cafe_chat";
const FALLBACK_STATE_DIR: &str = ".cafe_chat";

#[derive(Debug, Clone, Parser)]
#[command(name = "cafe_chat", version, about = "Streaming terminal client for the cafe assistant")]
pub struct Cli {
    /// Base URL of the chat service.
    #[arg(long, env = "CAFE_CHAT_API_URL", default_value = DEFAULT_CHAT_BASE_URL)]
    pub api_url: String,

    /// Backend implementation: `http` or `mock`.
    #[arg(long, env = "CAFE_CHAT_BACKEND", default_value = "http")]
    pub backend: String,

    /// Directory holding the persisted session identity.
    #[arg(long, env = "CAFE_CHAT_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// `server` keeps context in the server session; `explicit` sends prior turns.
    #[arg(long, env = "CAFE_CHAT_HISTORY_MODE", default_value = "server")]
    pub history_mode: String,

    /// What a failed turn removes: `turn` (prompt and reply) or `reply`.
    #[arg(long, env = "CAFE_CHAT_ROLLBACK", default_value = "turn")]
    pub rollback: String,

    /// Resume a known server session instead of the persisted one.
    #[arg(long, env = "CAFE_CHAT_SESSION_ID")]
    pub session_id: Option<String>,

    /// Extra request header as `NAME=VALUE`. Repeatable.
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request timeout in seconds. Unset leaves timeouts to the transport.
    #[arg(long, env = "CAFE_CHAT_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, env = "CAFE_CHAT_VERBOSE")]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("API URL must not be empty")]
    EmptyApiUrl,
    #[error("unknown history mode '{0}'; expected 'server' or 'explicit'")]
    InvalidHistoryMode(String),
    #[error("unknown rollback policy '{0}'; expected 'turn' or 'reply'")]
    InvalidRollback(String),
    #[error("timeout must be at least one second")]
    ZeroTimeout,
    #[error("invalid session id '{0}'")]
    InvalidSessionId(String),
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub api_url: String,
    pub backend_id: String,
    pub state_dir: PathBuf,
    pub options: ConversationOptions,
    /// Identity to adopt at startup, replacing the persisted one.
    pub session_id: Option<SessionId>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub verbose: bool,
}

impl ChatConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_url = cli.api_url.trim().to_string();
        if api_url.is_empty() {
            return Err(ConfigError::EmptyApiUrl);
        }

        let history_mode = HistoryMode::parse(&cli.history_mode)
            .ok_or_else(|| ConfigError::InvalidHistoryMode(cli.history_mode.clone()))?;
        let rollback_policy = RollbackPolicy::parse(&cli.rollback)
            .ok_or_else(|| ConfigError::InvalidRollback(cli.rollback.clone()))?;

        let timeout = match cli.timeout_secs {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let session_id = cli
            .session_id
            .map(|value| {
                SessionId::parse(value.trim())
                    .map_err(|_| ConfigError::InvalidSessionId(value.clone()))
            })
            .transpose()?;

        Ok(Self {
            api_url,
            backend_id: cli.backend.trim().to_ascii_lowercase(),
            state_dir: cli.state_dir.unwrap_or_else(default_state_dir),
            options: ConversationOptions {
                history_mode,
                rollback_policy,
            },
            session_id,
            headers: cli.headers,
            timeout,
            verbose: cli.verbose,
        })
    }
}

fn parse_header(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, header_value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), header_value.trim().to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{value}'")),
    }
}

pub fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_STATE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ChatConfig, ConfigError> {
        let mut argv = vec!["cafe_chat", "--state-dir", "/tmp/cafe-state"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("arguments should parse");
        ChatConfig::from_cli(cli)
    }

    #[test]
    fn explicit_flags_are_validated_into_options() {
        let config = parse(&[
            "--api-url",
            " http://cafe.local:9000 ",
            "--backend",
            "MOCK",
            "--history-mode",
            "explicit",
            "--rollback",
            "reply",
            "--timeout-secs",
            "30",
            "--session-id",
            " 3f2b0c1e-resume ",
            "--header",
            "X-Cafe-Location=harbour",
            "--header",
            "X-Trace = abc",
            "--verbose",
        ])
        .expect("config");

        assert_eq!(config.api_url, "http://cafe.local:9000");
        assert_eq!(config.backend_id, "mock");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/cafe-state"));
        assert_eq!(config.options.history_mode, HistoryMode::Explicit);
        assert_eq!(config.options.rollback_policy, RollbackPolicy::RemoveReply);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            config.session_id,
            Some(SessionId::parse("3f2b0c1e-resume").expect("valid id"))
        );
        assert_eq!(
            config.headers,
            vec![
                ("X-Cafe-Location".to_string(), "harbour".to_string()),
                ("X-Trace".to_string(), "abc".to_string()),
            ]
        );
        assert!(config.verbose);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            parse(&["--history-mode", "sometimes"]),
            Err(ConfigError::InvalidHistoryMode("sometimes".to_string()))
        );
        assert_eq!(
            parse(&["--rollback", "never"]),
            Err(ConfigError::InvalidRollback("never".to_string()))
        );
        assert_eq!(parse(&["--timeout-secs", "0"]), Err(ConfigError::ZeroTimeout));
        assert_eq!(parse(&["--api-url", "   "]), Err(ConfigError::EmptyApiUrl));
        assert_eq!(
            parse(&["--session-id", "two words"]),
            Err(ConfigError::InvalidSessionId("two words".to_string()))
        );
    }

    #[test]
    fn malformed_headers_are_rejected_by_the_parser() {
        let argv = ["cafe_chat", "--header", "no-equals-sign"];
        assert!(Cli::try_parse_from(argv).is_err());

        let argv = ["cafe_chat", "--header", "=value"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn default_state_dir_ends_with_app_name() {
        let dir = default_state_dir();
        assert!(dir.ends_with(STATE_DIR_NAME) || dir.ends_with(FALLBACK_STATE_DIR));
    }
}
