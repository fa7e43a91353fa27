//!
//! src/token.rs  Andrew Belles  Sept 14th, 2025
//!
//! Bearer credential with expiry tracking. The guard is the single owner of
//! the token; every catalog call asks it for a bearer and invalidates it on
//! an authorization failure
//!

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::snapshot::write_json_atomic;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { access_token: access_token.into(), expires_at }
    }

    pub fn expiring_in(access_token: impl Into<String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self::new(access_token, now + ttl)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// keep the secret out of logs
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Synchronous accessor for a possibly-expired credential
pub trait TokenProvider: Send + Sync {
    fn current_token(&self) -> Option<Token>;
}

///
/// Durable side-store for the token, one JSON file
///
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Token>, SyncError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into())
        };
        let token: Token = serde_json::from_str(&raw)?;
        Ok(Some(token))
    }

    /// Writes through a temp file in the same directory so a crash never
    /// leaves a torn token file behind
    pub fn save(&self, token: &Token) -> Result<(), SyncError> {
        write_json_atomic(&self.path, token)
    }

    pub fn clear(&self) -> Result<(), SyncError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into())
        }
    }
}

///
/// Holds the token in memory, backed by an optional side-store
///
#[derive(Debug, Default)]
pub struct TokenGuard {
    held: Mutex<Option<Token>>,
    store: Option<FileTokenStore>,
    // bumped whenever the held credential is replaced or dropped
    generation: AtomicU64,
}

impl TokenGuard {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_store(store: FileTokenStore) -> Self {
        Self { store: Some(store), ..Self::default() }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Token>> {
        // a panic while holding the lock cannot leave the Option half-written
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Installs a freshly authorized token in memory and the side-store
    pub fn authorize(&self, token: Token) -> Result<(), SyncError> {
        if let Some(store) = &self.store {
            store.save(&token)?;
        }
        info!(expires_at = %token.expires_at, "token.authorized");
        *self.lock() = Some(token);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Discards the token after the catalog rejected it
    pub fn invalidate(&self) {
        warn!("token.invalidated");
        self.discard();
    }

    /// Explicit disconnect by the user
    pub fn disconnect(&self) {
        info!("token.disconnected");
        self.discard();
    }

    fn discard(&self) {
        *self.lock() = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!(error = %e, path = %store.path().display(), "token.store.clear");
            }
        }
    }

    pub fn current_token_at(&self, now: DateTime<Utc>) -> Option<Token> {
        let mut held = self.lock();

        if held.is_none() {
            if let Some(store) = &self.store {
                match store.load() {
                    Ok(loaded) => *held = loaded,
                    Err(e) => warn!(error = %e, "token.store.load"),
                }
            }
        }

        let expired = match held.as_ref() {
            Some(token) if token.is_valid_at(now) => return Some(token.clone()),
            Some(token) => {
                debug!(expired_at = %token.expires_at, "token.expired");
                true
            }
            None => false
        };

        // no lazy cleanup, an expired token is gone from both places now
        if expired {
            *held = None;
            drop(held);
            self.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(store) = &self.store {
                if let Err(e) = store.clear() {
                    warn!(error = %e, "token.store.clear");
                }
            }
        }
        None
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_token().is_some()
    }

    /// Epoch of the held credential, `None` without a valid one. Anything
    /// cached on behalf of a user is only good for the epoch it was read in.
    pub fn session(&self) -> Option<u64> {
        self.current_token()
            .map(|_| self.generation.load(Ordering::SeqCst))
    }

    /// Bearer string for an outbound call or `AuthExpired`
    pub fn bearer(&self) -> Result<String, SyncError> {
        self.current_token()
            .map(|t| t.access_token)
            .ok_or(SyncError::AuthExpired)
    }
}

impl TokenProvider for TokenGuard {
    fn current_token(&self) -> Option<Token> {
        self.current_token_at(Utc::now())
    }
}
