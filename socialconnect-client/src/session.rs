use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, io};

use log::warn;
use parking_lot::Mutex;
use thiserror::Error;

use crate::{UpdatedUser, UserData};

/// The file name of the persisted session snapshot
pub const SNAPSHOT_FILE: &str = "social_connect_user.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access the snapshot: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot is not a valid user record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A place to persist the current-user snapshot across process restarts
pub trait SnapshotStorage: Send + Sync {
    fn load(&self) -> Result<Option<UserData>, SnapshotError>;
    fn save(&self, user: &UserData) -> Result<(), SnapshotError>;
    fn clear(&self) -> Result<(), SnapshotError>;
}

/// Stores the snapshot as a JSON document at a fixed path
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional snapshot location inside a state directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir.into().join(SNAPSHOT_FILE))
    }
}

impl SnapshotStorage for FileSnapshot {
    fn load(&self) -> Result<Option<UserData>, SnapshotError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, user: &UserData) -> Result<(), SnapshotError> {
        let raw = serde_json::to_string(user)?;
        fs::write(&self.path, raw)?;

        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the serialized snapshot in memory. The test stand-in for
/// [FileSnapshot]; cloning shares the same stored bytes, and malformed
/// contents can be seeded directly.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    raw: Arc<Mutex<Option<String>>>,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the stored bytes as-is, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// The persisted bytes, if any
    pub fn raw(&self) -> Option<String> {
        self.raw.lock().clone()
    }
}

impl SnapshotStorage for MemorySnapshot {
    fn load(&self) -> Result<Option<UserData>, SnapshotError> {
        self.raw
            .lock()
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(SnapshotError::from)
    }

    fn save(&self, user: &UserData) -> Result<(), SnapshotError> {
        *self.raw.lock() = Some(serde_json::to_string(user)?);

        Ok(())
    }

    fn clear(&self) -> Result<(), SnapshotError> {
        *self.raw.lock() = None;

        Ok(())
    }
}

/// The process-wide current-user state.
///
/// This is an explicit cache of the store's user record: it is allowed to
/// drift, and [Session::update_current_user] is the only merge path back.
/// Cloning shares the same state.
pub struct Session<P> {
    inner: Arc<SessionInner<P>>,
}

struct SessionInner<P> {
    user: Mutex<Option<UserData>>,
    storage: P,
}

impl<P> Clone for Session<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P> Session<P>
where
    P: SnapshotStorage,
{
    /// Restores the session from persisted state. An absent or unreadable
    /// snapshot means logged out.
    pub fn restore(storage: P) -> Self {
        let user = match storage.load() {
            Ok(user) => user,
            Err(e) => {
                warn!("discarding unreadable session snapshot: {e}");
                None
            }
        };

        Self {
            inner: Arc::new(SessionInner {
                user: Mutex::new(user),
                storage,
            }),
        }
    }

    /// The current user, if any
    pub fn current_user(&self) -> Option<UserData> {
        self.inner.user.lock().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.user.lock().is_some()
    }

    /// Replaces the session with `user` and persists the snapshot.
    pub fn login(&self, user: UserData) {
        *self.inner.user.lock() = Some(user.clone());

        if let Err(e) = self.inner.storage.save(&user) {
            warn!("failed to persist session snapshot: {e}");
        }
    }

    /// Clears the session and deletes the persisted snapshot.
    pub fn logout(&self) {
        *self.inner.user.lock() = None;

        if let Err(e) = self.inner.storage.clear() {
            warn!("failed to clear session snapshot: {e}");
        }
    }

    /// Shallow-merges `update` into the current user and persists the
    /// result. Does nothing when logged out.
    pub fn update_current_user(&self, update: &UpdatedUser) {
        let merged = {
            let mut user = self.inner.user.lock();

            match user.as_mut() {
                Some(user) => {
                    update.apply_to(user);
                    user.clone()
                }
                None => return,
            }
        };

        if let Err(e) = self.inner.storage.save(&merged) {
            warn!("failed to persist session snapshot: {e}");
        }
    }
}
