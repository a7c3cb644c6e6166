//! Persisted credential pair.
//!
//! The client reads the pair at session start and when asked to
//! authenticate from storage, writes it on access grant, and clears it when
//! a new token is requested or authentication is rejected.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// User id and auth token issued by the server. Both are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: String,
    pub auth_token: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(user_id: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            auth_token: auth_token.into(),
        }
    }
}

/// Storage for the credential pair.
///
/// Called on the delivery context, so no other inbound frame is handled
/// until a call returns. Implementations must return quickly and must not
/// block on network or user input.
pub trait CredentialStore: Send + Sync {
    /// Stored pair, if any.
    fn load(&self) -> Result<Option<Credentials>>;
    /// Replace the stored pair.
    fn save(&self, credentials: &Credentials) -> Result<()>;
    /// Forget the stored pair.
    fn clear(&self) -> Result<()>;
}

/// In-process store. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `credentials`.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            slot: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// JSON file store. A missing file means no credentials.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store credentials at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the credentials file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credentials>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        // Write-then-rename so a crash never leaves half a file behind.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(credentials)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AyiError;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save(&Credentials::new("u1", "t1")).unwrap();
        assert_eq!(store.load().unwrap(), Some(Credentials::new("u1", "t1")));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();

        store.save(&Credentials::new("u1", "t1")).unwrap();
        assert_eq!(store.load().unwrap(), Some(Credentials::new("u1", "t1")));

        let reopened = FileCredentialStore::new(store.path());
        assert_eq!(reopened.load().unwrap(), Some(Credentials::new("u1", "t1")));

        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileCredentialStore::new(path).load();
        assert!(matches!(result, Err(AyiError::Json(_))));
    }
}
