//! REST client for the hosted backend.
//!
//! Two APIs share one base URL:
//! - `/auth/v1/*`: GoTrue-style credential exchange returning bearer tokens.
//! - `/rest/v1/<table>`: PostgREST-style table access. Filters are query
//!   params of the form `column=op.value`; row-level security applies to the
//!   bearer token's user.
//!
//! Every request carries the project key in `apikey`. Data calls that must
//! return exactly one row ask for `application/vnd.pgrst.object+json`, which
//! makes the backend answer 406 for zero rows; that maps to `NotFound`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{AuthError, BackendError};
use super::{AuthApi, MarketplaceStore, ProfileStore};
use crate::config::BackendConfig;
use crate::model::{
    Booking, BookingFilter, BookingStatus, Credentials, Identity, NewBooking, NewReview, Profile, ProfileUpdate,
    Review, ServiceOffering, Session, Technician, TechnicianFilter, VerificationUpdate,
};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Which credential exchange a failed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthCall {
    Password,
    SignUp,
    Refresh,
    SignOut,
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Identity,
}

impl TokenResponse {
    fn into_session(self, now_unix: i64) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now_unix + self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        Session { access_token: self.access_token, refresh_token: self.refresh_token, expires_at, user: self.user }
    }
}

/// Error bodies differ between auth versions; take whichever fields appear.
#[derive(Debug, Default, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn code(&self) -> String {
        self.error_code
            .clone()
            .or_else(|| self.error.clone())
            .or_else(|| match &self.code {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn message(&self, raw: &str) -> String {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| raw.to_owned())
    }
}

fn map_auth_error(call: AuthCall, status: u16, body: &str) -> AuthError {
    let parsed = ErrorBody::parse(body);
    let code = parsed.code();
    let message = parsed.message(body);
    let lowered = message.to_ascii_lowercase();

    match call {
        AuthCall::Password if code == "invalid_credentials" || (status == 400 && code == "invalid_grant") => {
            AuthError::InvalidCredentials
        }
        AuthCall::SignUp if code == "user_already_exists" || code == "email_exists" || lowered.contains("already registered") => {
            AuthError::AlreadyRegistered
        }
        AuthCall::Refresh
            if matches!(status, 400 | 401)
                && matches!(
                    code.as_str(),
                    "invalid_grant" | "refresh_token_not_found" | "refresh_token_already_used" | "session_not_found"
                ) =>
        {
            AuthError::SessionExpired
        }
        _ => AuthError::Rejected { status, message },
    }
}

fn map_data_error(status: u16, body: &str, what: &str) -> BackendError {
    match status {
        404 | 406 => BackendError::NotFound(what.to_owned()),
        409 => BackendError::Conflict(ErrorBody::parse(body).message(body)),
        _ => BackendError::Rejected { status, body: body.to_owned() },
    }
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Strip characters that carry meaning inside PostgREST filter values.
fn filter_literal(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ',' | '{' | '}' | '(' | ')' | '"' | '*'))
        .collect::<String>()
        .trim()
        .to_owned()
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for the hosted backend. Cheap to share behind an `Arc`.
pub struct BaasClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl BaasClient {
    /// Build a client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::HttpClientBuild`] if the TLS/HTTP stack cannot be initialized.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.url.clone(), anon_key: config.anon_key.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, url: String, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    // -------------------------------------------------------------------------
    // auth plumbing
    // -------------------------------------------------------------------------

    async fn send_auth(&self, call: AuthCall, req: RequestBuilder) -> Result<String, AuthError> {
        let resp = req.send().await.map_err(|e| AuthError::Request(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| AuthError::Request(e.to_string()))?;
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(map_auth_error(call, status, &body))
        }
    }

    async fn token_grant(&self, call: AuthCall, grant: &str, body: serde_json::Value) -> Result<Session, AuthError> {
        let req = self
            .request(Method::POST, self.auth_url("token"), None)
            .query(&[("grant_type", grant)])
            .json(&body);
        let text = self.send_auth(call, req).await?;
        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::Parse(format!("{e}: {text}")))?;
        Ok(token.into_session(now_unix()))
    }

    // -------------------------------------------------------------------------
    // table plumbing
    // -------------------------------------------------------------------------

    async fn send_data(&self, req: RequestBuilder, what: &str) -> Result<String, BackendError> {
        let resp = req.send().await.map_err(|e| BackendError::Request(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| BackendError::Request(e.to_string()))?;
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            tracing::debug!(status, table = what, "backend data call failed");
            Err(map_data_error(status, &body, what))
        }
    }

    fn decode<T: DeserializeOwned>(text: &str) -> Result<T, BackendError> {
        serde_json::from_str(text).map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        token: &str,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let req = self
            .request(Method::GET, self.table_url(table), Some(token))
            .query(&[("select", "*")])
            .query(query);
        Self::decode(&self.send_data(req, table).await?)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        token: &str,
        table: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, BackendError> {
        let req = self
            .request(Method::GET, self.table_url(table), Some(token))
            .header("Accept", SINGLE_OBJECT)
            .query(&[("select", "*")])
            .query(query);
        Self::decode(&self.send_data(req, what).await?)
    }

    async fn insert<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        token: &str,
        table: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let req = self
            .request(Method::POST, self.table_url(table), Some(token))
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .json(body);
        Self::decode(&self.send_data(req, table).await?)
    }

    async fn update<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        token: &str,
        table: &str,
        query: &[(&str, String)],
        body: &B,
        what: &str,
    ) -> Result<T, BackendError> {
        let req = self
            .request(Method::PATCH, self.table_url(table), Some(token))
            .header("Accept", SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .query(query)
            .json(body);
        Self::decode(&self.send_data(req, what).await?)
    }
}

// =============================================================================
// TRAIT IMPLS
// =============================================================================

#[async_trait]
impl AuthApi for BaasClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let body = serde_json::json!({ "email": credentials.email, "password": credentials.password });
        self.token_grant(AuthCall::Password, "password", body).await
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError> {
        let req = self
            .request(Method::POST, self.auth_url("signup"), None)
            .json(&serde_json::json!({ "email": credentials.email, "password": credentials.password }));
        let text = self.send_auth(AuthCall::SignUp, req).await?;
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| AuthError::Parse(e.to_string()))?;

        // Without auto-confirm the backend returns the bare user and no tokens.
        if value.get("access_token").is_none() {
            return Ok(None);
        }
        let token: TokenResponse = serde_json::from_value(value).map_err(|e| AuthError::Parse(e.to_string()))?;
        Ok(Some(token.into_session(now_unix())))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let req = self.request(Method::POST, self.auth_url("logout"), Some(access_token));
        match self.send_auth(AuthCall::SignOut, req).await {
            Ok(_) => Ok(()),
            // Token already revoked or expired: the session is gone either way.
            Err(AuthError::Rejected { status: 401 | 403 | 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        self.token_grant(AuthCall::Refresh, "refresh_token", body).await
    }
}

#[async_trait]
impl ProfileStore for BaasClient {
    async fn get_profile(&self, access_token: &str, user_id: Uuid) -> Result<Profile, BackendError> {
        self.select_one(access_token, "profiles", &[("id", eq(user_id))], "profile")
            .await
    }

    async fn update_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        self.update(access_token, "profiles", &[("id", eq(user_id))], update, "profile")
            .await
    }
}

#[async_trait]
impl MarketplaceStore for BaasClient {
    async fn list_technicians(
        &self,
        access_token: &str,
        filter: &TechnicianFilter,
    ) -> Result<Vec<Technician>, BackendError> {
        let mut query = vec![("order", "full_name.asc".to_owned())];
        if let Some(status) = filter.status {
            query.push(("verification_status", eq(status.as_str())));
        }
        if let Some(city) = filter.city.as_deref().map(filter_literal).filter(|c| !c.is_empty()) {
            query.push(("city", format!("ilike.{city}")));
        }
        if let Some(kind) = filter.appliance.as_deref().map(filter_literal).filter(|a| !a.is_empty()) {
            query.push(("appliances", format!("cs.{{{kind}}}")));
        }
        self.select(access_token, "technicians", &query).await
    }

    async fn get_technician(&self, access_token: &str, id: Uuid) -> Result<Technician, BackendError> {
        self.select_one(access_token, "technicians", &[("id", eq(id))], "technician")
            .await
    }

    async fn update_verification(
        &self,
        access_token: &str,
        id: Uuid,
        update: &VerificationUpdate,
    ) -> Result<Technician, BackendError> {
        self.update(access_token, "technicians", &[("id", eq(id))], update, "technician")
            .await
    }

    async fn list_services(&self, access_token: &str, technician_id: Uuid) -> Result<Vec<ServiceOffering>, BackendError> {
        let query = [("technician_id", eq(technician_id)), ("order", "base_price_cents.asc".to_owned())];
        self.select(access_token, "services", &query).await
    }

    async fn list_reviews(&self, access_token: &str, technician_id: Uuid) -> Result<Vec<Review>, BackendError> {
        let query = [("technician_id", eq(technician_id)), ("order", "created_at.desc".to_owned())];
        self.select(access_token, "reviews", &query).await
    }

    async fn insert_review(&self, access_token: &str, review: &NewReview) -> Result<Review, BackendError> {
        self.insert(access_token, "reviews", review).await
    }

    async fn get_booking(&self, access_token: &str, id: Uuid) -> Result<Booking, BackendError> {
        self.select_one(access_token, "bookings", &[("id", eq(id))], "booking")
            .await
    }

    async fn list_bookings(&self, access_token: &str, filter: &BookingFilter) -> Result<Vec<Booking>, BackendError> {
        let mut query = vec![("order", "scheduled_for.desc".to_owned())];
        if let Some(id) = filter.customer_id {
            query.push(("customer_id", eq(id)));
        }
        if let Some(id) = filter.technician_id {
            query.push(("technician_id", eq(id)));
        }
        self.select(access_token, "bookings", &query).await
    }

    async fn insert_booking(&self, access_token: &str, booking: &NewBooking) -> Result<Booking, BackendError> {
        self.insert(access_token, "bookings", booking).await
    }

    async fn update_booking_status(
        &self,
        access_token: &str,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, BackendError> {
        let body = serde_json::json!({ "status": status });
        self.update(access_token, "bookings", &[("id", eq(id))], &body, "booking")
            .await
    }
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
