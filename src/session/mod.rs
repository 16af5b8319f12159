//! Persisted login state: the authenticated identity and its bearer token.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub token: String,
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        !self.user_id.is_empty() && !self.token.is_empty()
    }
}

pub trait IdentityProvider: Send + Sync {
    /// The authenticated identity, or `None` when logged out.
    fn current_identity(&self) -> Option<Identity>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "jwtToken")]
    token: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// JSON-file backed credential store. An unreadable or corrupt file is
/// treated as logged out.
pub struct SessionStore {
    path: Option<PathBuf>,
    data: RwLock<StoredSession>,
}

impl SessionStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Discarding unreadable session file {}: {err}", path.display());
                StoredSession::default()
            })
        } else {
            StoredSession::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoredSession::default()),
        }
    }

    pub fn current(&self) -> Option<Identity> {
        let guard = self.read();
        let identity = Identity {
            user_id: guard.user_id.clone()?,
            token: guard.token.clone()?,
        };
        identity.is_authenticated().then_some(identity)
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone().filter(|token| !token.is_empty())
    }

    /// Writes the credentials to disk first; memory only changes once the
    /// write succeeded.
    pub fn set_credentials(&self, user_id: &str, token: &str) -> Result<()> {
        let mut guard = self.write();
        let next = StoredSession {
            token: Some(token.to_string()),
            user_id: Some(user_id.to_string()),
        };
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        let mut guard = self.write();
        *guard = StoredSession::default();
        match &self.path {
            Some(path) if path.exists() => fs::remove_file(path)
                .with_context(|| format!("Failed to remove session file {}", path.display())),
            _ => Ok(()),
        }
    }

    fn persist(&self, data: &StoredSession) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        write_private(path, serialized.as_bytes())
            .with_context(|| format!("Failed to write session to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, StoredSession> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoredSession> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The token file is readable by its owner only.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    // `mode` only applies on creation; tighten a file left by older runs.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

impl IdentityProvider for SessionStore {
    fn current_identity(&self) -> Option<Identity> {
        self.current()
    }
}
