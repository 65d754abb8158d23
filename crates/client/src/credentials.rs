//! Bearer credential storage
//!
//! The gateway reads the credential before every request and clears it
//! when the service answers 401, so the next attempt starts clean.
//! Storage failures are logged, never propagated: a token that fails to
//! persist still works for the current session.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

/// Where the gateway keeps its bearer token
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current token, if any
    async fn get(&self) -> Option<String>;

    /// Replace the stored token; an empty token clears instead
    async fn set(&self, token: &str);

    /// Drop the stored token
    async fn clear(&self);
}

fn sanitize(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// In-memory credential store, dropped with the session
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a token
    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(sanitize(token)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn set(&self, token: &str) {
        *self.token.write().await = sanitize(token);
    }

    async fn clear(&self) {
        *self.token.write().await = None;
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    token: String,
}

/// Credential store persisted to a JSON file, surviving restarts
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, reading any previously persisted token.
    /// A missing file is an empty store, not an error.
    pub async fn load(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let cached = read_token(&path).await?;
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Option<String> {
        self.cached.read().await.clone()
    }

    async fn set(&self, token: &str) {
        let token = sanitize(token);
        *self.cached.write().await = token.clone();
        let result = match token {
            Some(token) => write_token(&self.path, &token).await,
            None => remove_token(&self.path).await,
        };
        if let Err(err) = result {
            warn!("Failed to persist credential: {}", err);
        }
    }

    async fn clear(&self) {
        *self.cached.write().await = None;
        if let Err(err) = remove_token(&self.path).await {
            warn!("Failed to remove persisted credential: {}", err);
        }
    }
}

async fn read_token(path: &Path) -> std::io::Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    // A file we cannot parse is treated as no credential
    Ok(serde_json::from_str::<StoredCredential>(&content)
        .ok()
        .and_then(|stored| sanitize(&stored.token)))
}

async fn write_token(path: &Path, token: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(&StoredCredential {
        token: token.to_string(),
    })
    .map_err(std::io::Error::other)?;
    tokio::fs::write(path, content).await
}

async fn remove_token(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
