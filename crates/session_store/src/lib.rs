//! Durable session identity for the chat client.
//!
//! One opaque identifier per installation correlates this client with its
//! server-side conversation record. It is created on first use, persisted under
//! the state directory and only replaced after an explicit `clear`.

mod error;
mod paths;
mod schema;
mod store;

pub use error::SessionStoreError;
pub use paths::{identity_path, IDENTITY_FILE_NAME};
pub use schema::IdentityRecord;
pub use store::{FileIdentityStore, IdentityProvider, MemoryIdentityStore};
