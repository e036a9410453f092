//! Bearer token persistence
//!
//! The client keeps exactly one credential between runs: the access token
//! returned by login or register. Three backends implement [`TokenStore`]:
//!
//! - [`KeyringTokenStore`]: the OS native credential store (Keychain on
//!   macOS, Secret Service on Linux, Windows Credential Manager on Windows)
//! - [`FileTokenStore`]: a JSON file, by default in the platform data
//!   directory
//! - [`MemoryTokenStore`]: process memory, for tests and throwaway sessions
//!
//! Tokens are serialized to JSON as a [`StoredToken`] before storage.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyflowError};

// ---------------------------------------------------------------------------
// StoredToken
// ---------------------------------------------------------------------------

/// A persisted credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// The bearer token issued by `/auth/login` or `/auth/register`.
    pub access_token: String,

    /// When the token was saved locally.
    pub saved_at: DateTime<Utc>,
}

impl StoredToken {
    /// Wrap a freshly issued access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            saved_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenStore
// ---------------------------------------------------------------------------

/// Storage for the single session credential.
///
/// `load_token` returns `Ok(None)` when nothing has been saved, allowing
/// callers to distinguish between "not logged in" and a genuine storage
/// error. `delete_token` is idempotent.
pub trait TokenStore: Send + Sync {
    /// Persist `token`, replacing any previous one.
    fn save_token(&self, token: &StoredToken) -> Result<()>;

    /// Load the persisted token, if any.
    fn load_token(&self) -> Result<Option<StoredToken>>;

    /// Remove the persisted token. A no-op when none exists.
    fn delete_token(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// KeyringTokenStore
// ---------------------------------------------------------------------------

/// Stateless accessor for the OS native keyring.
///
/// The token is stored under the `studyflow` service, keyed by the backend
/// host so that two deployments do not overwrite each other's credential.
///
/// # Examples
///
/// ```no_run
/// use studyflow::auth::token_store::{KeyringTokenStore, StoredToken, TokenStore};
///
/// let store = KeyringTokenStore::new("localhost:8000");
/// store.save_token(&StoredToken::new("abc")).unwrap();
/// assert!(store.load_token().unwrap().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    const SERVICE: &'static str = "studyflow";

    /// Create a store for the given backend identity (usually host:port).
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(Self::SERVICE, &self.account)
            .map_err(|e| StudyflowError::Keyring(e).into())
    }
}

impl TokenStore for KeyringTokenStore {
    fn save_token(&self, token: &StoredToken) -> Result<()> {
        let json_str = serde_json::to_string(token)?;
        self.entry()?
            .set_password(&json_str)
            .map_err(StudyflowError::Keyring)?;
        Ok(())
    }

    fn load_token(&self) -> Result<Option<StoredToken>> {
        match self.entry()?.get_password() {
            Ok(json_str) => {
                let token: StoredToken = serde_json::from_str(&json_str)?;
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StudyflowError::Keyring(e).into()),
        }
    }

    fn delete_token(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StudyflowError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// FileTokenStore
// ---------------------------------------------------------------------------

/// JSON file token store.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store the token at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Store the token as `token.json` in the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Config`] if no home directory can be
    /// determined.
    pub fn in_data_dir() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("io", "studyflow", "studyflow").ok_or_else(|| {
            StudyflowError::Config("Could not determine data directory".to_string())
        })?;
        Ok(Self::new(proj_dirs.data_dir().join("token.json")))
    }

    /// Location of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn save_token(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json_str = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, json_str)?;
        Ok(())
    }

    fn load_token(&self) -> Result<Option<StoredToken>> {
        match std::fs::read_to_string(&self.path) {
            Ok(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StudyflowError::Io(e).into()),
        }
    }

    fn delete_token(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StudyflowError::Io(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryTokenStore
// ---------------------------------------------------------------------------

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<StoredToken>>,
}

impl MemoryTokenStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `access_token`.
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(StoredToken::new(access_token))),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<StoredToken>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn save_token(&self, token: &StoredToken) -> Result<()> {
        *self.slot() = Some(token.clone());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<StoredToken>> {
        Ok(self.slot().clone())
    }

    fn delete_token(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
