use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{context::RequestContext, error::ClientError};
use crate::models::PublicUser;

/// What a successful login leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

/// Durable slot holding the serialized session document.
///
/// Stores deal in raw text so that a corrupt document can still be loaded
/// and then discarded by [`SessionManager::restore`].
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, ClientError>;
    fn save(&self, document: &str) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Keeps the session in a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, document: &str) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, document)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>, ClientError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, document: &str) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(document.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Owns the current session and keeps the durable copy in step with it.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self {
            store,
            current: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySessionStore::default()))
    }

    /// Loads the stored session. A document that does not parse is removed
    /// and treated as no session at all.
    pub fn restore(&self) -> Result<Option<Session>, ClientError> {
        let restored = match self.store.load()? {
            None => None,
            Some(doc) => match serde_json::from_str::<Session>(&doc) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(error = %e, "stored session unreadable; clearing it");
                    self.store.clear()?;
                    None
                }
            },
        };
        *self.slot() = restored.clone();
        Ok(restored)
    }

    pub fn begin(&self, session: Session) -> Result<(), ClientError> {
        self.store.save(&serde_json::to_string(&session)?)?;
        debug!(email = %session.user.email, "session started");
        *self.slot() = Some(session);
        Ok(())
    }

    pub fn end(&self) -> Result<(), ClientError> {
        *self.slot() = None;
        self.store.clear()?;
        debug!("session cleared");
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.slot().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.slot().is_some()
    }

    /// Credentials for the next request.
    pub fn context(&self) -> RequestContext {
        RequestContext {
            token: self.slot().as_ref().map(|s| s.token.clone()),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
