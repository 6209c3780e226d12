//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Page routes sit behind the navigation guard middleware, which answers
//! with `303 See Other` whenever the guard picks a destination. JSON API
//! routes under `/api` authenticate with the session cookie and never
//! redirect; they report the guard's choice in a `next` field instead.

pub mod auth;
pub mod guard;
pub mod marketplace;

#[cfg(test)]
pub(crate) mod test_helpers;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::backend::{AuthError, BackendError};
use crate::model::ValidationError;
use crate::services::ServiceError;
use crate::state::AppState;

/// Pages rendered behind the guard.
fn page_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(guard::page))
        .route("/auth/signin", get(guard::page))
        .route("/auth/signup", get(guard::page))
        .route("/auth/role-selection", get(guard::page))
        .route("/onboarding/customer", get(guard::page))
        .route("/onboarding/provider", get(guard::page))
        .route("/dashboard/customer", get(guard::page))
        .route("/dashboard/provider", get(guard::page))
        .route("/dashboard/admin", get(guard::page))
        .route("/technicians", get(guard::page))
        .route("/technicians/{id}", get(guard::page))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::navigation_guard))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin", post(auth::sign_in))
        .route("/api/auth/signup", post(auth::sign_up))
        .route("/api/auth/signout", post(auth::sign_out))
        .route("/api/auth/me", get(auth::me))
        .route("/api/profile/role", put(auth::select_role))
        .route("/api/profile/onboarding", put(auth::complete_onboarding))
        .route("/api/technicians", get(marketplace::list_technicians))
        .route("/api/technicians/{id}", get(marketplace::technician_detail))
        .route(
            "/api/bookings",
            get(marketplace::list_bookings).post(marketplace::create_booking),
        )
        .route("/api/bookings/{id}", patch(marketplace::update_booking))
        .route("/api/reviews", post(marketplace::submit_review))
        .route("/api/admin/technicians", get(marketplace::admin_technicians))
        .route(
            "/api/admin/technicians/{id}/verification",
            put(marketplace::set_verification),
        )
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(page_routes(&state))
        .merge(api_routes())
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// API ERRORS
// =============================================================================

/// JSON error response: `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// Server-side failures are logged in full and reported generically.
    fn upstream(status: StatusCode, detail: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "backend call failed");
        Self::new(status, "the service is temporarily unavailable")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = auth::auth_error_status(&err);
        if status.is_server_error() {
            return Self::upstream(status, &err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        let status = auth::backend_error_status(&err);
        if status.is_server_error() {
            return Self::upstream(status, &err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Backend(inner) => inner.into(),
            other => Self::new(marketplace::service_error_status(&other), other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
