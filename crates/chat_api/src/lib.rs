//! Transport-only client primitives for the chat service.
//!
//! This crate owns URL building, request payloads, the server-sent-events
//! decoder and the lazy delta stream. It knows nothing about transcripts or
//! session identity.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod sse;
pub mod stream;
pub mod url;

pub use client::ChatApiClient;
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use events::{StreamFrame, StreamTermination};
pub use payload::{ChatStreamRequest, SessionMessagesResponse, WireMessage};
pub use sse::SseFrameDecoder;
pub use stream::{ByteStream, DeltaStream};
pub use url::{normalize_base_url, DEFAULT_CHAT_BASE_URL};
