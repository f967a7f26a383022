//! Streaming chat client core.
//!
//! Invariant: the [`Conversation`] is the only writer of its [`Transcript`];
//! presentation code reads it through accessors and [`TurnEvent`] callbacks.
//!
//! # Public API Overview
//! - Build a [`Conversation`] from a `ChatBackend` and an `IdentityProvider`.
//! - [`Conversation::hydrate`] loads server-held history at startup.
//! - [`Conversation::send_with`] runs one optimistic turn and reports each
//!   transcript mutation.
//! - [`config`], [`logging`] and [`backends`] wire up the binary.

pub mod backends;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod hydrate;
pub mod interrupt;
pub mod logging;
pub mod transcript;

pub use crate::config::{ChatConfig, Cli, ConfigError};
pub use crate::conversation::{
    Conversation, ConversationError, ConversationOptions, RollbackPolicy, TurnEvent, TurnOutcome,
    EMPTY_REPLY_ERROR, INTERRUPTED_ERROR,
};
pub use crate::hydrate::HistoryHydrator;
pub use crate::transcript::{Entry, OpenTurn, Transcript};

pub use chat_provider::{HistoryMode, Message, Role, SessionId, Termination};
