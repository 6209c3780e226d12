//! Stateful session for one client, on top of the stateless backend APIs.
//!
//! Holds the current backend session, refreshes it when it is about to
//! expire, and broadcasts every transition as an [`AuthChange`].

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use super::{AuthChange, ProfileSource, SessionSource};
use crate::backend::{AuthApi, AuthError, BackendError, ProfileStore};
use crate::model::{Credentials, Profile, ProfileUpdate, Session};

const EVENT_CAPACITY: usize = 16;

pub struct ClientSession {
    auth: Arc<dyn AuthApi>,
    profiles: Arc<dyn ProfileStore>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

impl ClientSession {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthApi>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self::build(auth, profiles, None)
    }

    /// Start from a session persisted elsewhere (e.g. a saved refresh token).
    #[must_use]
    pub fn with_session(auth: Arc<dyn AuthApi>, profiles: Arc<dyn ProfileStore>, session: Session) -> Self {
        Self::build(auth, profiles, Some(session))
    }

    fn build(auth: Arc<dyn AuthApi>, profiles: Arc<dyn ProfileStore>, session: Option<Session>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { auth, profiles, session: RwLock::new(session), events }
    }

    fn emit(&self, change: AuthChange) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }

    /// Replace the session with a refreshed one if it is expired.
    ///
    /// The refresh runs under the write lock and re-checks expiry first, so
    /// concurrent callers share one refresh of the single-use token.
    async fn fresh_session(&self) -> Result<Option<Session>, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        match self.session.read().await.as_ref() {
            None => return Ok(None),
            Some(current) if !current.is_expired(now) => return Ok(Some(current.clone())),
            Some(_) => {}
        }

        let mut slot = self.session.write().await;
        let Some(current) = slot.clone() else {
            return Ok(None);
        };
        if !current.is_expired(now) {
            return Ok(Some(current));
        }

        match self.auth.refresh(&current.refresh_token).await {
            Ok(session) => {
                tracing::debug!(user_id = %session.user.id, "session refreshed");
                *slot = Some(session.clone());
                self.emit(AuthChange::TokenRefreshed(session.clone()));
                Ok(Some(session))
            }
            Err(AuthError::SessionExpired) => {
                tracing::info!(user_id = %current.user.id, "refresh token rejected, signing out locally");
                *slot = None;
                self.emit(AuthChange::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn access_token(&self) -> Result<String, BackendError> {
        self.fresh_session()
            .await?
            .map(|s| s.access_token)
            .ok_or(BackendError::NoSession)
    }
}

#[async_trait]
impl SessionSource for ClientSession {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.fresh_session().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let session = self.auth.sign_in(credentials).await?;
        *self.session.write().await = Some(session.clone());
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError> {
        let session = self.auth.sign_up(credentials).await?;
        if let Some(session) = &session {
            *self.session.write().await = Some(session.clone());
            self.emit(AuthChange::SignedIn(session.clone()));
        }
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.session.write().await.take();
        let result = match &previous {
            Some(session) => self.auth.sign_out(&session.access_token).await,
            None => Ok(()),
        };
        if previous.is_some() {
            self.emit(AuthChange::SignedOut);
        }
        result
    }
}

#[async_trait]
impl ProfileSource for ClientSession {
    async fn get_profile(&self, user_id: Uuid) -> Result<Profile, BackendError> {
        let token = self.access_token().await?;
        self.profiles.get_profile(&token, user_id).await
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Profile, BackendError> {
        let token = self.access_token().await?;
        self.profiles.update_profile(&token, user_id, update).await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
