//! Server-side session registry.
//!
//! ARCHITECTURE
//! ============
//! Browsers hold an opaque random cookie token. The registry maps it to the
//! backend session (access + refresh token), which never leaves the server.
//!
//! TRADE-OFFS
//! ==========
//! The registry is in memory, so a restart signs everyone out. Expired
//! backend sessions are refreshed lazily on the next request; a rejected
//! refresh drops the entry instead of retrying. Refresh is serialized per
//! entry, so a page load and its API calls arriving together after expiry
//! trigger one refresh between them.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{Mutex, RwLock};

use crate::backend::{AuthApi, AuthError};
use crate::model::Session;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// One registry slot. Locked for the duration of a refresh so concurrent
/// requests on the same cookie share the result instead of racing the
/// backend's single-use refresh token.
type Entry = Arc<Mutex<Session>>;

/// Cookie token -> backend session. Cheap to clone; clones share entries.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a backend session under a fresh token and return the token.
    pub async fn create(&self, session: Session) -> String {
        let token = generate_token();
        self.entries
            .write()
            .await
            .insert(token.clone(), Arc::new(Mutex::new(session)));
        token
    }

    async fn entry(&self, token: &str) -> Option<Entry> {
        self.entries.read().await.get(token).cloned()
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        let entry = self.entry(token).await?;
        let session = entry.lock().await.clone();
        Some(session)
    }

    pub async fn remove(&self, token: &str) -> Option<Session> {
        let entry = self.entries.write().await.remove(token)?;
        let session = entry.lock().await.clone();
        Some(session)
    }

    /// Look up `token`, refreshing the backend session if it has expired.
    ///
    /// Returns `Ok(None)` for unknown tokens and for sessions whose refresh
    /// token was rejected (the entry is dropped).
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of a refresh that failed for any other reason.
    pub async fn resolve(&self, token: &str, auth: &dyn AuthApi, now_unix: i64) -> Result<Option<Session>, AuthError> {
        let Some(entry) = self.entry(token).await else {
            return Ok(None);
        };
        let mut session = entry.lock().await;
        if !session.is_expired(now_unix) {
            return Ok(Some(session.clone()));
        }

        match auth.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                tracing::debug!(user_id = %fresh.user.id, "server session refreshed");
                *session = fresh.clone();
                Ok(Some(fresh))
            }
            Err(AuthError::SessionExpired) => {
                tracing::info!(user_id = %session.user.id, "refresh rejected, dropping server session");
                self.entries.write().await.remove(token);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
