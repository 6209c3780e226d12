//! Marketplace business rules and server-side sessions.
//!
//! ARCHITECTURE
//! ============
//! Service functions take the store trait object and the [`Caller`] and
//! enforce who may do what. The backend's row-level security is the second
//! line; these checks produce the user-facing errors. Route handlers only
//! translate HTTP to service calls and [`ServiceError`] to status codes.

pub mod booking;
pub mod catalog;
pub mod review;
pub mod session;
pub mod verification;

use uuid::Uuid;

use crate::backend::BackendError;
use crate::model::Role;

/// The signed-in user a service call acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Option<Role>,
    pub access_token: String,
}

impl Caller {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => Self::NotFound(what),
            BackendError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Backend(other),
        }
    }
}

/// Trim, drop if empty, reject if over `max` characters.
pub(crate) fn optional_text(value: Option<String>, field: &str, max: usize) -> Result<Option<String>, ServiceError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max {
        return Err(ServiceError::Invalid(format!("{field} must be at most {max} characters")));
    }
    Ok(Some(trimmed.to_owned()))
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    pub fn caller(user_id: Uuid, role: Option<Role>, access_token: &str) -> Caller {
        Caller { user_id, role, access_token: access_token.to_owned() }
    }
}
