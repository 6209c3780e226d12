//! Backend error types.

/// Failures of credential operations (sign-in, sign-up, sign-out, refresh).
///
/// These are surfaced to the user; the message is safe to display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    AlreadyRegistered,

    /// Refresh token unknown, revoked or expired.
    #[error("session expired, please sign in again")]
    SessionExpired,

    #[error("auth service rejected request: status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("auth request failed: {0}")]
    Request(String),

    #[error("auth response parse failed: {0}")]
    Parse(String),
}

/// Failures of data calls (profiles, marketplace tables).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("no active session")]
    NoSession,

    #[error("{0} not found")]
    NotFound(String),

    /// Unique or foreign-key violation reported by the backend.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend rejected request: status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("backend request failed: {0}")]
    Request(String),

    #[error("backend response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl From<AuthError> for BackendError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::SessionExpired => Self::NoSession,
            AuthError::Request(msg) => Self::Request(msg),
            AuthError::Parse(msg) => Self::Parse(msg),
            other => Self::Rejected { status: 401, body: other.to_string() },
        }
    }
}
