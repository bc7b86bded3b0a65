//! Token storage consulted before every authenticated call.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Key of the bearer access token.
pub const ACCESS_TOKEN: &str = "@accessToken";
/// Key of the refresh token.
pub const REFRESH_TOKEN: &str = "@refreshToken";

/// Credential storage failure.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The backing file could not be read or written
    #[error("credential file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not hold a JSON object of strings
    #[error("credential file {path} is corrupt: {source}")]
    Corrupt {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

type CredentialFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CredentialError>> + Send + 'a>>;

/// Key-value token store.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` so the store can be shared as
/// `Arc<dyn CredentialStore>` by the transport.
pub trait CredentialStore: Send + Sync {
    /// Token stored under `key`, if any.
    fn get<'a>(&'a self, key: &'a str) -> CredentialFuture<'a, Option<String>>;

    /// Store `token` under `key`, replacing the previous value.
    fn set<'a>(&'a self, key: &'a str, token: &'a str) -> CredentialFuture<'a, ()>;

    /// Forget the token stored under `key`.
    fn remove<'a>(&'a self, key: &'a str) -> CredentialFuture<'a, ()>;
}

/// Tokens kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with an access token and a refresh token.
    #[must_use]
    pub fn with_tokens(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        let tokens = HashMap::from([
            (ACCESS_TOKEN.to_string(), access.into()),
            (REFRESH_TOKEN.to_string(), refresh.into()),
        ]);
        Self {
            tokens: RwLock::new(tokens),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get<'a>(&'a self, key: &'a str) -> CredentialFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.tokens.read().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, key: &'a str, token: &'a str) -> CredentialFuture<'a, ()> {
        Box::pin(async move {
            self.tokens.write().await.insert(key.to_string(), token.to_string());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> CredentialFuture<'a, ()> {
        Box::pin(async move {
            self.tokens.write().await.remove(key);
            Ok(())
        })
    }
}

/// Tokens persisted as a JSON object in a file.
///
/// A missing file reads as an empty store; the file is created on the first
/// write. Writes are serialized within the process and replace the file by
/// renaming a staged copy over it.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    /// A store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>, CredentialError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                });
            },
        };
        serde_json::from_slice(&bytes).map_err(|source| CredentialError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn store(&self, tokens: &HashMap<String, String>) -> Result<(), CredentialError> {
        let bytes = serde_json::to_vec_pretty(tokens).map_err(|source| CredentialError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let io = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };
        // Readers see either the old file or the new one, never a partial write.
        let staging = self.staging_path();
        tokio::fs::write(&staging, bytes).await.map_err(io)?;
        tokio::fs::rename(&staging, &self.path).await.map_err(io)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn update<F>(&self, change: F) -> Result<(), CredentialError>
    where
        F: FnOnce(&mut HashMap<String, String>) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut tokens = self.load().await?;
        change(&mut tokens);
        self.store(&tokens).await
    }
}

impl CredentialStore for FileCredentialStore {
    fn get<'a>(&'a self, key: &'a str) -> CredentialFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.load().await?.remove(key)) })
    }

    fn set<'a>(&'a self, key: &'a str, token: &'a str) -> CredentialFuture<'a, ()> {
        Box::pin(self.update(move |tokens| {
            tokens.insert(key.to_string(), token.to_string());
        }))
    }

    fn remove<'a>(&'a self, key: &'a str) -> CredentialFuture<'a, ()> {
        Box::pin(self.update(move |tokens| {
            tokens.remove(key);
        }))
    }
}
