//! Request builders and signed-in fixtures for router tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use tower::ServiceExt;
use uuid::Uuid;

use super::app;
use super::auth::COOKIE_NAME;
use crate::backend::test_helpers::FakeBackend;
use crate::model::{Identity, Role};
use crate::state::AppState;
use crate::state::test_helpers::test_app_state;

pub fn fixture() -> (Arc<FakeBackend>, AppState) {
    let fake = FakeBackend::new();
    let state = test_app_state(&fake);
    (fake, state)
}

/// Create a user in the given state and return a `Cookie` header value for them.
pub async fn signed_in(
    state: &AppState,
    fake: &FakeBackend,
    role: Option<Role>,
    onboarded: bool,
) -> (Identity, String) {
    let identity = fake.add_account(&format!("{}@example.com", Uuid::new_v4()), "pw");
    fake.update_row(identity.id, |p| {
        p.role = role;
        if onboarded {
            p.phone = Some("5550102030".into());
            p.onboarding_complete = Some(true);
        }
    });
    let token = state.sessions.create(fake.issue(&identity)).await;
    (identity, format!("{COOKIE_NAME}={token}"))
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn json(method: Method, uri: &str, cookie: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
    app(state.clone()).oneshot(request).await.expect("infallible")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
