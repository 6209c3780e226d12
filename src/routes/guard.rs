//! Navigation guard for server-rendered pages.
//!
//! The middleware resolves the visitor's auth state once per request and
//! runs [`guard::decide`] on the requested path. A destination becomes a
//! `303 See Other`; otherwise the page renders with the snapshot attached.
//! Server-side the state is always resolved, so `loading` is never set.

use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;

use super::auth::{current_session, load_profile};
use crate::guard;
use crate::model::AuthSnapshot;
use crate::state::AppState;

pub async fn navigation_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let snapshot = match current_session(&state, &jar).await {
        Ok(Some((_, session))) => {
            let profile = load_profile(&state, &session).await;
            AuthSnapshot::signed_in(session.user, profile)
        }
        Ok(None) => AuthSnapshot::signed_out(),
        Err(e) => {
            tracing::error!(error = %e, "session refresh failed");
            return (StatusCode::BAD_GATEWAY, "authentication service unavailable").into_response();
        }
    };

    let path = request.uri().path();
    if let Some(destination) = guard::decide(path, &snapshot) {
        tracing::debug!(from = path, to = destination.path(), "guard redirect");
        return Redirect::to(destination.path()).into_response();
    }

    request.extensions_mut().insert(snapshot);
    next.run(request).await
}

fn page_title(path: &str) -> &'static str {
    match guard::normalize(path) {
        "/" => "KitchenFix",
        "/auth/signin" => "Sign in",
        "/auth/signup" => "Create an account",
        "/auth/role-selection" => "How will you use KitchenFix?",
        "/onboarding/customer" => "Tell us about your kitchen",
        "/onboarding/provider" => "Set up your technician profile",
        "/dashboard/customer" => "Your repairs",
        "/dashboard/provider" => "Your jobs",
        "/dashboard/admin" => "Admin",
        p if p.starts_with("/technicians") => "Technicians",
        _ => "KitchenFix",
    }
}

/// Minimal HTML shell. The page's data comes from the JSON API.
pub async fn page(uri: Uri, Extension(snapshot): Extension<AuthSnapshot>) -> Html<String> {
    let title = page_title(uri.path());
    let viewer = snapshot
        .identity
        .as_ref()
        .and_then(|i| i.email.as_deref())
        .map_or_else(String::new, |email| format!(r#"<p class="viewer">Signed in as {}</p>"#, escape(email)));
    let role = snapshot.role().map_or("", |r| r.as_str());

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body data-path="{path}" data-role="{role}">
<h1>{title}</h1>
{viewer}
<main id="app"></main>
</body>
</html>
"#,
        path = escape(uri.path()),
    ))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
