//! Auth routes: sign-in/up/out, current user, role and onboarding writes.

use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::ApiError;
use crate::backend::{AuthError, BackendError};
use crate::guard::{self, Destination};
use crate::model::{AuthSnapshot, Credentials, Identity, OnboardingDetails, Profile, ProfileUpdate, Role, Session};
use crate::services::Caller;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "kf_session";

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

pub(crate) fn auth_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
        AuthError::AlreadyRegistered => StatusCode::CONFLICT,
        AuthError::Rejected { status, .. } if (400..500).contains(status) => StatusCode::BAD_REQUEST,
        AuthError::Rejected { .. } | AuthError::Request(_) | AuthError::Parse(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn backend_error_status(err: &BackendError) -> StatusCode {
    match err {
        BackendError::NoSession => StatusCode::UNAUTHORIZED,
        BackendError::NotFound(_) => StatusCode::NOT_FOUND,
        BackendError::Conflict(_) => StatusCode::CONFLICT,
        BackendError::Rejected { status: 401 | 403, .. } => StatusCode::FORBIDDEN,
        BackendError::Rejected { .. }
        | BackendError::Request(_)
        | BackendError::Parse(_)
        | BackendError::HttpClientBuild(_) => StatusCode::BAD_GATEWAY,
    }
}

// =============================================================================
// SESSION RESOLUTION
// =============================================================================

/// The server session named by the request cookie, refreshed if needed.
pub(crate) async fn current_session(state: &AppState, jar: &CookieJar) -> Result<Option<(String, Session)>, AuthError> {
    let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let session = state.sessions.resolve(token, &*state.auth, now).await?;
    Ok(session.map(|s| (token.to_owned(), s)))
}

/// Profile row for the session's user. A missing row or failed fetch is `None`.
pub(crate) async fn load_profile(state: &AppState, session: &Session) -> Option<Profile> {
    match state
        .profiles
        .get_profile(&session.access_token, session.user.id)
        .await
    {
        Ok(profile) => Some(profile),
        Err(BackendError::NotFound(_)) => None,
        Err(e) => {
            tracing::warn!(user_id = %session.user.id, error = %e, "profile fetch failed");
            None
        }
    }
}

fn next_for(from: &str, snapshot: &AuthSnapshot) -> Option<&'static str> {
    guard::decide(from, snapshot).map(Destination::path)
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Signed-in user from the session cookie. Rejects with 401 otherwise.
pub struct AuthUser {
    pub token: String,
    pub session: Session,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);
        current_session(&app_state, &jar)
            .await?
            .map(|(token, session)| Self { token, session })
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "sign in required"))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);
        let role = match app_state
            .profiles
            .get_profile(&user.session.access_token, user.session.user.id)
            .await
        {
            Ok(profile) => profile.role,
            Err(BackendError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self { user_id: user.session.user.id, role, access_token: user.session.access_token })
    }
}

// =============================================================================
// BODIES
// =============================================================================

#[derive(Deserialize)]
pub struct CredentialsBody {
    email: String,
    password: String,
    /// Page the form was submitted from; drives `next`.
    #[serde(default)]
    from: Option<String>,
}

#[derive(Deserialize)]
pub struct RoleBody {
    role: Role,
    #[serde(default)]
    from: Option<String>,
}

#[derive(Deserialize)]
pub struct OnboardingBody {
    #[serde(flatten)]
    details: OnboardingDetails,
    #[serde(default)]
    from: Option<String>,
}

#[derive(Deserialize)]
pub struct MeQuery {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: Identity,
    pub profile: Option<Profile>,
    pub next: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
    pub next: Option<&'static str>,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Register `session` under a new cookie, dropping any session the old cookie named.
async fn establish(state: &AppState, jar: CookieJar, session: Session, from: &str) -> (CookieJar, Json<AuthResponse>) {
    if let Some(old) = jar.get(COOKIE_NAME) {
        state.sessions.remove(old.value()).await;
    }
    let profile = load_profile(state, &session).await;
    let snapshot = AuthSnapshot::signed_in(session.user.clone(), profile.clone());
    let next = next_for(from, &snapshot);
    let user = session.user.clone();
    let token = state.sessions.create(session).await;

    let jar = jar.add(session_cookie(token, state.cookie_secure));
    (jar, Json(AuthResponse { user, profile, next }))
}

/// `POST /api/auth/signin`
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CredentialsBody>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let credentials = Credentials::new(&body.email, &body.password)?;
    let session = state.auth.sign_in(&credentials).await?;
    tracing::info!(user_id = %session.user.id, "signed in");
    let from = body.from.as_deref().unwrap_or(guard::SIGN_IN_PATH);
    Ok(establish(&state, jar, session, from).await)
}

/// `POST /api/auth/signup`. 202 when the address must be confirmed first.
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CredentialsBody>,
) -> Result<Response, ApiError> {
    let credentials = Credentials::new(&body.email, &body.password)?;
    let Some(session) = state.auth.sign_up(&credentials).await? else {
        tracing::info!("sign-up awaiting email confirmation");
        let body = serde_json::json!({ "confirmation_required": true });
        return Ok((StatusCode::ACCEPTED, Json(body)).into_response());
    };
    tracing::info!(user_id = %session.user.id, "signed up");
    let from = body.from.as_deref().unwrap_or(guard::SIGN_UP_PATH);
    Ok(establish(&state, jar, session, from).await.into_response())
}

/// `POST /api/auth/signout`. The cookie is cleared even if the backend call fails.
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    let result = match jar.get(COOKIE_NAME) {
        Some(cookie) => match state.sessions.remove(cookie.value()).await {
            Some(session) => state.auth.sign_out(&session.access_token).await,
            None => Ok(()),
        },
        None => Ok(()),
    };

    let jar = CookieJar::new().add(cleared_cookie(state.cookie_secure));
    match result {
        Ok(()) => (jar, StatusCode::NO_CONTENT).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "backend sign-out failed, server session dropped anyway");
            (jar, ApiError::from(e)).into_response()
        }
    }
}

/// `GET /api/auth/me[?path=/x]`. `next` is the guard's answer for `path`.
pub async fn me(State(state): State<AppState>, user: AuthUser, Query(query): Query<MeQuery>) -> Json<AuthResponse> {
    let profile = load_profile(&state, &user.session).await;
    let snapshot = AuthSnapshot::signed_in(user.session.user.clone(), profile.clone());
    let next = query.path.as_deref().and_then(|p| next_for(p, &snapshot));
    Json(AuthResponse { user: user.session.user, profile, next })
}

/// `PUT /api/profile/role`
pub async fn select_role(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<RoleBody>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .profiles
        .update_profile(&user.session.access_token, user.session.user.id, &ProfileUpdate::role(body.role))
        .await?;
    tracing::info!(user_id = %user.session.user.id, role = %body.role, "role selected");

    let from = body.from.as_deref().unwrap_or(guard::ROLE_SELECTION_PATH);
    let snapshot = AuthSnapshot::signed_in(user.session.user, Some(profile.clone()));
    let next = next_for(from, &snapshot);
    Ok(Json(ProfileResponse { profile, next }))
}

/// `PUT /api/profile/onboarding`
pub async fn complete_onboarding(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OnboardingBody>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let update = body.details.into_update()?;
    let profile = state
        .profiles
        .update_profile(&user.session.access_token, user.session.user.id, &update)
        .await?;
    tracing::info!(user_id = %user.session.user.id, "onboarding completed");

    let default_from = profile
        .role
        .and_then(guard::onboarding_path)
        .unwrap_or(guard::ROOT_PATH);
    let from = body.from.as_deref().unwrap_or(default_from);
    let snapshot = AuthSnapshot::signed_in(user.session.user, Some(profile.clone()));
    let next = next_for(from, &snapshot);
    Ok(Json(ProfileResponse { profile, next }))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
