use serde::{Deserialize, Serialize};

pub const IDENTITY_RECORD_VERSION: u32 = 1;

/// On-disk form of the persisted session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityRecord {
    pub version: u32,
    pub session_id: String,
    pub created_at: String,
}

impl IdentityRecord {
    #[must_use]
    pub fn v1(session_id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            version: IDENTITY_RECORD_VERSION,
            session_id: session_id.into(),
            created_at: created_at.into(),
        }
    }
}
