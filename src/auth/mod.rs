//! Client-side auth: session source, state holder, reactive guard driver.
//!
//! ARCHITECTURE
//! ============
//! ```text
//! SessionSource --AuthChange--> AuthStore --watch<AuthSnapshot>--> GuardDriver --> Navigator
//!                                  ^                                   ^
//! ProfileSource ---- profile ------+               path changes -------+
//! ```
//! `AuthStore` is the single writer of the snapshot channel. The driver only
//! reads, and calls `guard::decide` on every change.

pub mod client;
pub mod driver;
pub mod store;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::backend::{AuthError, BackendError};
use crate::model::{Credentials, Profile, ProfileUpdate, Session, ValidationError};

pub use client::ClientSession;
pub use driver::{GuardDriver, Navigator, PathRouter};
pub use store::AuthStore;

/// Auth state transitions announced by a [`SessionSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    UserUpdated(Session),
}

/// Supplies the current identity and announces changes to it.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// `Ok(None)` when the account awaits email confirmation.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Profile rows for the signed-in user.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fails when no row exists.
    async fn get_profile(&self, user_id: Uuid) -> Result<Profile, BackendError>;

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<Profile, BackendError>;
}

/// Failure of a profile write made through the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("no signed-in user")]
    SignedOut,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
