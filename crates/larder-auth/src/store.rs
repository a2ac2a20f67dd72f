//! Credential persistence backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, Result};

/// Default credential file name within the larder data directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// The two client-owned persisted values, stored and cleared as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token proving authentication.
    pub token: String,

    /// Whether the user asked to stay signed in across restarts.
    #[serde(default)]
    pub remember: bool,
}

impl Credentials {
    /// Create credentials for a freshly issued token.
    pub fn new(token: impl Into<String>, remember: bool) -> Self {
        Self {
            token: token.into(),
            remember,
        }
    }
}

/// Trait for credential storage backends.
///
/// `load` is called once per outgoing request; implementations must return
/// the current persisted state rather than a copy cached at an earlier point.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Load the persisted credentials, if any.
    async fn load(&self) -> Result<Option<Credentials>>;

    /// Persist new credentials, replacing any existing ones.
    async fn save(&self, credentials: &Credentials) -> Result<()>;

    /// Delete the persisted credentials. Idempotent.
    async fn clear(&self) -> Result<()>;

    /// Check whether credentials exist without reading them.
    fn has_credentials(&self) -> bool;
}

/// Shared credential store handle for use across async contexts.
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

// ============================================================================
// FileCredentialStore
// ============================================================================

/// File-based credential store for production use.
///
/// Every `load` re-reads the file; the token is process-wide mutable state
/// and a concurrent logout must be visible to the next request immediately.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store rooted at the given data directory.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CREDENTIALS_FILE),
        }
    }

    /// Create a store with an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| CredentialError::Io(format!("Failed to read credential file: {}", e)))?;

        let credentials: Credentials = serde_json::from_str(&content).map_err(|e| {
            CredentialError::Serialization(format!("Failed to parse credential file: {}", e))
        })?;

        Ok(Some(credentials))
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CredentialError::Io(format!("Failed to create credential directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(credentials).map_err(|e| {
            CredentialError::Serialization(format!("Failed to serialize credentials: {}", e))
        })?;

        std::fs::write(&self.path, json)
            .map_err(|e| CredentialError::Io(format!("Failed to write credential file: {}", e)))?;

        tracing::debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                CredentialError::Io(format!("Failed to delete credential file: {}", e))
            })?;
            tracing::debug!(path = %self.path.display(), "Credentials cleared");
        }
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        self.path.exists()
    }
}

// ============================================================================
// InMemoryCredentialStore
// ============================================================================

/// In-memory credential store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: parking_lot::RwLock<Option<Credentials>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: parking_lot::RwLock::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        Ok(self.credentials.read().clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        *self.credentials.write() = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.credentials.write() = None;
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        self.credentials.read().is_some()
    }
}
