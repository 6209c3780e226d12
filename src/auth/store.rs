//! Observable auth state: identity, profile and the loading flag.
//!
//! DESIGN
//! ======
//! The store owns a `watch` channel of [`AuthSnapshot`] and is its only
//! writer. Readers clone the latest snapshot or await changes.
//!
//! Identity and profile are published together, after the profile fetch
//! resolves. Publishing the identity first would expose a signed-in user
//! with no profile, and the guard would bounce them to role selection.
//!
//! Every identity resolution takes a generation number. A result is only
//! published if no newer resolution (or sign-out) started in the meantime,
//! so a slow fetch for an old session cannot overwrite a newer state.
//!
//! `loading` is true while the initial session check or any credential
//! operation is in flight. It is derived from a pending counter so that
//! overlapping operations cannot clear it early.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{AuthChange, ProfileError, ProfileSource, SessionSource};
use crate::backend::AuthError;
use crate::model::{AuthSnapshot, Credentials, Identity, OnboardingDetails, Profile, ProfileUpdate, Role, Session};

/// Result of a sign-up that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn,
    /// The backend wants the address confirmed before issuing a session.
    ConfirmationRequired,
}

pub struct AuthStore {
    sessions: Arc<dyn SessionSource>,
    profiles: Arc<dyn ProfileSource>,
    tx: watch::Sender<AuthSnapshot>,
    pending: Mutex<usize>,
    generation: AtomicU64,
    initialized: AtomicBool,
}

/// Holds `loading` up until dropped.
struct Pending<'a> {
    store: &'a AuthStore,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.store.release();
    }
}

impl AuthStore {
    /// Starts in the loading state; call [`AuthStore::initialize`] to resolve it.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionSource>, profiles: Arc<dyn ProfileSource>) -> Self {
        let (tx, _) = watch::channel(AuthSnapshot::loading());
        Self {
            sessions,
            profiles,
            tx,
            pending: Mutex::new(1),
            generation: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Resolve the initial session. Only the first call does anything.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = match self.sessions.current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "initial session check failed, treating as signed out");
                None
            }
        };
        self.resolve(session).await;
        self.release();
    }

    /// Forward changes announced by the session source into the store.
    ///
    /// Subscribes before spawning so no change is missed between the two.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut rx = self.sessions.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => store.apply_change(change).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth change listener lagged, resyncing");
                        store.resync().await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("auth change source closed");
                        break;
                    }
                }
            }
        })
    }

    pub async fn apply_change(&self, change: AuthChange) {
        match change {
            AuthChange::InitialSession(session) => {
                if self.initialized.swap(true, Ordering::SeqCst) {
                    return;
                }
                self.resolve(session).await;
                self.release();
            }
            AuthChange::SignedIn(session) => {
                let current = self.snapshot();
                if current.user_id() == Some(session.user.id) && current.profile.is_some() {
                    return;
                }
                self.resolve(Some(session)).await;
            }
            AuthChange::TokenRefreshed(session) => self.replace_identity(session.user),
            AuthChange::UserUpdated(session) => self.resolve(Some(session)).await,
            AuthChange::SignedOut => self.clear(),
        }
    }

    async fn resync(&self) {
        match self.sessions.current_session().await {
            Ok(session) => self.resolve(session).await,
            Err(e) => tracing::warn!(error = %e, "resync failed"),
        }
    }

    // =========================================================================
    // CREDENTIAL OPERATIONS
    // =========================================================================

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let _pending = self.begin();
        let session = self.sessions.sign_in(credentials).await?;
        tracing::info!(user_id = %session.user.id, "signed in");
        self.resolve(Some(session)).await;
        Ok(())
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, AuthError> {
        let _pending = self.begin();
        match self.sessions.sign_up(credentials).await? {
            Some(session) => {
                tracing::info!(user_id = %session.user.id, "signed up");
                self.resolve(Some(session)).await;
                Ok(SignUpOutcome::SignedIn)
            }
            None => {
                tracing::info!("sign-up awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    /// Clears local state first. A backend failure is still returned.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _pending = self.begin();
        self.clear();
        let result = self.sessions.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "backend sign-out failed, local state cleared anyway");
        }
        result
    }

    // =========================================================================
    // PROFILE OPERATIONS
    // =========================================================================

    /// Re-read the signed-in user's profile row.
    pub async fn refresh_profile(&self) -> Result<(), ProfileError> {
        let user_id = self.snapshot().user_id().ok_or(ProfileError::SignedOut)?;
        let profile = self.profiles.get_profile(user_id).await?;
        self.replace_profile(user_id, profile);
        Ok(())
    }

    pub async fn select_role(&self, role: Role) -> Result<(), ProfileError> {
        self.write_profile(&ProfileUpdate::role(role)).await
    }

    /// Validates the details, then writes them with the completion flag set.
    pub async fn complete_onboarding(&self, details: OnboardingDetails) -> Result<(), ProfileError> {
        let update = details.into_update()?;
        self.write_profile(&update).await
    }

    async fn write_profile(&self, update: &ProfileUpdate) -> Result<(), ProfileError> {
        let user_id = self.snapshot().user_id().ok_or(ProfileError::SignedOut)?;
        let profile = self.profiles.update_profile(user_id, update).await?;
        self.replace_profile(user_id, profile);
        Ok(())
    }

    // =========================================================================
    // PUBLISHING
    // =========================================================================

    fn lock_pending(&self) -> MutexGuard<'_, usize> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Pending<'_> {
        let mut pending = self.lock_pending();
        *pending += 1;
        self.tx.send_if_modified(|s| !std::mem::replace(&mut s.loading, true));
        Pending { store: self }
    }

    fn release(&self) {
        let mut pending = self.lock_pending();
        *pending = pending.saturating_sub(1);
        let loading = *pending > 0;
        self.tx
            .send_if_modified(|s| std::mem::replace(&mut s.loading, loading) != loading);
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Fetch the profile for `session` and publish both, unless superseded.
    async fn resolve(&self, session: Option<Session>) {
        let generation = self.next_generation();
        let Some(session) = session else {
            self.publish(generation, None, None);
            return;
        };
        let profile = match self.profiles.get_profile(session.user.id).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(user_id = %session.user.id, error = %e, "profile fetch failed");
                None
            }
        };
        self.publish(generation, Some(session.user), profile);
    }

    fn publish(&self, generation: u64, identity: Option<Identity>, profile: Option<Profile>) {
        self.tx.send_if_modified(|s| {
            if self.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "discarding superseded auth state");
                return false;
            }
            if s.identity == identity && s.profile == profile {
                return false;
            }
            s.identity = identity;
            s.profile = profile;
            true
        });
    }

    fn clear(&self) {
        let generation = self.next_generation();
        self.publish(generation, None, None);
    }

    /// Swap in a new profile for the user still signed in as `user_id`.
    fn replace_profile(&self, user_id: Uuid, profile: Profile) {
        self.tx.send_if_modified(|s| {
            if s.user_id() != Some(user_id) || s.profile.as_ref() == Some(&profile) {
                return false;
            }
            s.profile = Some(profile);
            true
        });
    }

    fn replace_identity(&self, identity: Identity) {
        self.tx.send_if_modified(|s| {
            if s.user_id() != Some(identity.id) || s.identity.as_ref() == Some(&identity) {
                return false;
            }
            s.identity = Some(identity);
            true
        });
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
