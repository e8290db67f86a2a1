//! Session token persistence.
//!
//! The token store is a leaf dependency: store, read, and clear an opaque
//! [`SessionToken`], nothing else. It never triggers a cart refresh itself -
//! the auth flow is responsible for calling the synchronizer after `set` or
//! `clear` (see [`sync`](crate::sync)).

use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

use greenmarket_core::SessionToken;

/// Errors that can occur when persisting a token.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the backing storage failed.
    #[error("token storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serializing the token failed.
    #[error("token serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Storage for the session token.
///
/// Contract:
/// - `set` persists the token for the lifetime of the backing storage
/// - `get` returns the current token or `None`; it never fails - unreadable
///   or corrupt storage reads as `None`
/// - `clear` removes the token and is idempotent
pub trait TokenStore: Send + Sync {
    /// Persist the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, token: &SessionToken) -> Result<(), StoreError>;

    /// Read the current token, if any.
    fn get(&self) -> Option<SessionToken>;

    /// Remove the token. Idempotent.
    fn clear(&self);
}

// =============================================================================
// MemoryTokenStore
// =============================================================================

/// Token storage that lives only as long as the process.
///
/// Used in tests and by embedding hosts that bring their own persistence.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<SessionToken>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn set(&self, token: &SessionToken) -> Result<(), StoreError> {
        *self.slot.lock().expect("token slot lock poisoned") = Some(token.clone());
        Ok(())
    }

    fn get(&self) -> Option<SessionToken> {
        self.slot.lock().expect("token slot lock poisoned").clone()
    }

    fn clear(&self) {
        *self.slot.lock().expect("token slot lock poisoned") = None;
    }
}

// =============================================================================
// FileTokenStore
// =============================================================================

/// Token storage backed by a JSON file on disk.
///
/// Survives process restarts, the desktop analogue of browser local storage.
/// Read and delete problems are logged and treated as "no token"; only `set`
/// surfaces failures, since losing a fresh login is user-visible.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn set(&self, token: &SessionToken) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(token)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn get(&self) -> Option<SessionToken> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read token file");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt token file, treating as logged out");
                None
            }
        }
    }

    fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove token file");
        }
    }
}
