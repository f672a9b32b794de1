//! Credential and preferred-agent storage.
//!
//! Reads and writes `~/.appgw/auth.json` with 0o600 permissions. The pipeline
//! only sees the [`AuthStore`] trait; [`FileAuthStore`] is the on-disk
//! implementation and [`MemoryAuthStore`] backs tests and throwaway sessions.

use std::path::{Path, PathBuf};

use appgw_core::{AgentEntity, Credentials};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

const AUTH_FILE_NAME: &str = "auth.json";
const STORAGE_VERSION: u32 = 1;

/// Path of the auth file under `data_dir`.
pub fn auth_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(AUTH_FILE_NAME)
}

/// On-disk auth state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStorage {
    /// Schema version.
    pub version: u32,
    /// Credentials of the last successful sign-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// Agent the user picked explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_agent: Option<AgentEntity>,
    /// RFC 3339 timestamp of the last write.
    #[serde(default)]
    pub last_updated: String,
}

impl AuthStorage {
    /// Empty storage at the current version.
    pub fn new() -> Self {
        Self {
            version: STORAGE_VERSION,
            credentials: None,
            preferred_agent: None,
            last_updated: String::new(),
        }
    }
}

impl Default for AuthStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Load auth storage.
///
/// Returns `None` if the file is missing, unreadable, invalid, or from an
/// unsupported version.
pub fn load_auth_storage(path: &Path) -> Option<AuthStorage> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read auth file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<AuthStorage>(&data) {
        Ok(storage) if storage.version == STORAGE_VERSION => Some(storage),
        Ok(storage) => {
            tracing::warn!("unsupported auth storage version: {}", storage.version);
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse auth file: {e}");
            None
        }
    }
}

/// Save auth storage, stamping `last_updated`.
///
/// Creates parent directories if needed and restricts the file to its owner.
pub fn save_auth_storage(path: &Path, storage: &mut AuthStorage) -> Result<(), AuthError> {
    storage.last_updated = chrono::Utc::now().to_rfc3339();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(storage)?;
    std::fs::write(path, &json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }

    Ok(())
}

/// Delete the auth file. A missing file is not an error.
pub fn clear_auth_storage(path: &Path) -> Result<(), AuthError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AuthError::Io(e)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuthStore
// ─────────────────────────────────────────────────────────────────────────────

/// Load/store collaborator for values the pipeline hands off.
pub trait AuthStore: Send + Sync {
    /// Credentials of the last successful sign-in.
    fn load_credentials(&self) -> Option<Credentials>;

    /// Persist credentials after a successful sign-in.
    fn store_credentials(&self, credentials: &Credentials) -> Result<(), AuthError>;

    /// Agent the user picked explicitly.
    fn load_preferred_agent(&self) -> Option<AgentEntity>;

    /// Remember the agent the user picked.
    fn store_preferred_agent(&self, agent: &AgentEntity) -> Result<(), AuthError>;
}

/// [`AuthStore`] backed by `auth.json`.
#[derive(Clone, Debug)]
pub struct FileAuthStore {
    path: PathBuf,
}

impl FileAuthStore {
    /// Store at an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `auth.json` under `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(auth_file_path(data_dir))
    }

    /// File path of this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, patch: impl FnOnce(&mut AuthStorage)) -> Result<(), AuthError> {
        let mut storage = load_auth_storage(&self.path).unwrap_or_default();
        patch(&mut storage);
        save_auth_storage(&self.path, &mut storage)
    }
}

impl AuthStore for FileAuthStore {
    fn load_credentials(&self) -> Option<Credentials> {
        load_auth_storage(&self.path)?.credentials
    }

    fn store_credentials(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.update(|s| s.credentials = Some(credentials.clone()))
    }

    fn load_preferred_agent(&self) -> Option<AgentEntity> {
        load_auth_storage(&self.path)?.preferred_agent
    }

    fn store_preferred_agent(&self, agent: &AgentEntity) -> Result<(), AuthError> {
        self.update(|s| s.preferred_agent = Some(agent.clone()))
    }
}

/// In-process [`AuthStore`].
#[derive(Debug, Default)]
pub struct MemoryAuthStore {
    inner: Mutex<AuthStorage>,
}

impl MemoryAuthStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        let store = Self::new();
        store.inner.lock().credentials = Some(credentials);
        store
    }

    /// Store preloaded with a preferred agent.
    #[must_use]
    pub fn preferring(self, agent: AgentEntity) -> Self {
        self.inner.lock().preferred_agent = Some(agent);
        self
    }
}

impl AuthStore for MemoryAuthStore {
    fn load_credentials(&self) -> Option<Credentials> {
        self.inner.lock().credentials.clone()
    }

    fn store_credentials(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.inner.lock().credentials = Some(credentials.clone());
        Ok(())
    }

    fn load_preferred_agent(&self) -> Option<AgentEntity> {
        self.inner.lock().preferred_agent.clone()
    }

    fn store_preferred_agent(&self, agent: &AgentEntity) -> Result<(), AuthError> {
        self.inner.lock().preferred_agent = Some(agent.clone());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
