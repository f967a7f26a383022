use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chat_provider::SessionId;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SessionStoreError;
use crate::paths::{identity_path, staging_path};
use crate::schema::{IdentityRecord, IDENTITY_RECORD_VERSION};

/// Supplies the session identity shared by hydration and every send.
pub trait IdentityProvider: Send + Sync {
    /// Returns the persisted identity, creating and persisting one if absent.
    fn get_identity(&self) -> Result<SessionId, SessionStoreError>;

    /// Forgets the persisted identity. The next `get_identity` creates a new one.
    fn clear(&self) -> Result<(), SessionStoreError>;

    /// Replaces the persisted identity with a known one, e.g. to resume a
    /// session started elsewhere.
    fn adopt(&self, session_id: SessionId) -> Result<(), SessionStoreError>;
}

/// File-backed identity stored as `<state_dir>/session.json`.
#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    cached: Mutex<Option<SessionId>>,
}

impl FileIdentityStore {
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: identity_path(state_dir),
            cached: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted record without creating one.
    pub fn load(&self) -> Result<Option<IdentityRecord>, SessionStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::io(
                    "reading identity file",
                    &self.path,
                    source,
                ))
            }
        };

        let record = serde_json::from_str::<IdentityRecord>(&text)
            .map_err(|source| SessionStoreError::json_parse(&self.path, source))?;
        validate_record(&self.path, &record)?;
        Ok(Some(record))
    }

    fn create(&self) -> Result<SessionId, SessionStoreError> {
        let session_id = new_session_id(&self.path)?;
        self.persist(&session_id)?;

        info!(path = %self.path.display(), "created new session identity");
        Ok(session_id)
    }

    fn persist(&self, session_id: &SessionId) -> Result<(), SessionStoreError> {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(SessionStoreError::ClockFormat)?;
        self.write_record(&IdentityRecord::v1(session_id.as_str(), created_at))
    }

    fn write_record(&self, record: &IdentityRecord) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                SessionStoreError::io("creating state directory", parent, source)
            })?;
        }

        let body = serde_json::to_string_pretty(record)
            .map_err(|source| SessionStoreError::json_serialize(&self.path, source))?;
        let staging = staging_path(&self.path);
        fs::write(&staging, body)
            .map_err(|source| SessionStoreError::io("writing identity file", &staging, source))?;
        fs::rename(&staging, &self.path).map_err(|source| {
            SessionStoreError::io("replacing identity file", &self.path, source)
        })
    }
}

impl IdentityProvider for FileIdentityStore {
    fn get_identity(&self) -> Result<SessionId, SessionStoreError> {
        let mut cached = lock_unpoisoned(&self.cached);
        if let Some(session_id) = cached.as_ref() {
            return Ok(session_id.clone());
        }

        let session_id = match self.load()? {
            Some(record) => parse_session_id(&self.path, record.session_id)?,
            None => self.create()?,
        };
        *cached = Some(session_id.clone());
        Ok(session_id)
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        let mut cached = lock_unpoisoned(&self.cached);
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed session identity"),
            Err(source) if source.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SessionStoreError::io(
                    "removing identity file",
                    &self.path,
                    source,
                ))
            }
        }
        *cached = None;
        Ok(())
    }

    fn adopt(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        let mut cached = lock_unpoisoned(&self.cached);
        self.persist(&session_id)?;
        info!(path = %self.path.display(), "adopted existing session identity");
        *cached = Some(session_id);
        Ok(())
    }
}

/// In-process identity that lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    current: Mutex<Option<SessionId>>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_identity(session_id: SessionId) -> Self {
        Self {
            current: Mutex::new(Some(session_id)),
        }
    }

    /// Current identity without generating one.
    #[must_use]
    pub fn peek(&self) -> Option<SessionId> {
        lock_unpoisoned(&self.current).clone()
    }
}

impl IdentityProvider for MemoryIdentityStore {
    fn get_identity(&self) -> Result<SessionId, SessionStoreError> {
        let mut current = lock_unpoisoned(&self.current);
        if let Some(session_id) = current.as_ref() {
            return Ok(session_id.clone());
        }

        let session_id = new_session_id(Path::new("<memory>"))?;
        *current = Some(session_id.clone());
        Ok(session_id)
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *lock_unpoisoned(&self.current) = None;
        Ok(())
    }

    fn adopt(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        *lock_unpoisoned(&self.current) = Some(session_id);
        Ok(())
    }
}

fn new_session_id(path: &Path) -> Result<SessionId, SessionStoreError> {
    parse_session_id(path, Uuid::new_v4().to_string())
}

fn parse_session_id(path: &Path, value: String) -> Result<SessionId, SessionStoreError> {
    SessionId::parse(value).map_err(|error| SessionStoreError::InvalidSessionId {
        path: path.to_path_buf(),
        value: error.value,
    })
}

fn validate_record(path: &Path, record: &IdentityRecord) -> Result<(), SessionStoreError> {
    if record.version != IDENTITY_RECORD_VERSION {
        return Err(SessionStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: record.version,
        });
    }

    if OffsetDateTime::parse(&record.created_at, &Rfc3339).is_err() {
        return Err(SessionStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            value: record.created_at.clone(),
        });
    }

    Ok(())
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
