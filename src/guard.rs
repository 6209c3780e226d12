//! Navigation guard: where must this user be sent from this path?
//!
//! DESIGN
//! ======
//! `decide` is a pure function over (path, snapshot). It is an ordered
//! decision list; the first matching rule wins:
//!
//! 1. loading                         -> stay (state not resolved yet)
//! 2. signed out on a protected page  -> sign-in
//! 3. signed in without a role        -> role selection
//! 4. role set, onboarding unfinished -> that role's onboarding page
//! 5. finished, on auth/onboarding/`/`-> that role's dashboard
//! 6. anything else                   -> stay
//!
//! Every destination is a page the same snapshot is allowed to stay on, so
//! re-evaluating after navigation settles instead of looping.

use crate::model::{AuthSnapshot, Role};

pub const ROOT_PATH: &str = "/";
pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const SIGN_UP_PATH: &str = "/auth/signup";
pub const ROLE_SELECTION_PATH: &str = "/auth/role-selection";
pub const CUSTOMER_ONBOARDING_PATH: &str = "/onboarding/customer";
pub const PROVIDER_ONBOARDING_PATH: &str = "/onboarding/provider";
pub const CUSTOMER_DASHBOARD_PATH: &str = "/dashboard/customer";
pub const PROVIDER_DASHBOARD_PATH: &str = "/dashboard/provider";
pub const ADMIN_DASHBOARD_PATH: &str = "/dashboard/admin";

const AUTH_PREFIX: &str = "/auth";
const ONBOARDING_PREFIX: &str = "/onboarding";
const DASHBOARD_PREFIX: &str = "/dashboard";

/// A redirect target chosen by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    SignIn,
    RoleSelection,
    Onboarding(Role),
    Dashboard(Role),
}

impl Destination {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::SignIn => SIGN_IN_PATH,
            Self::RoleSelection => ROLE_SELECTION_PATH,
            Self::Onboarding(role) => onboarding_path(role).unwrap_or(ROLE_SELECTION_PATH),
            Self::Dashboard(role) => dashboard_path(role),
        }
    }
}

#[must_use]
pub fn dashboard_path(role: Role) -> &'static str {
    match role {
        Role::Customer => CUSTOMER_DASHBOARD_PATH,
        Role::Provider => PROVIDER_DASHBOARD_PATH,
        Role::Admin => ADMIN_DASHBOARD_PATH,
    }
}

/// Admins have no onboarding flow.
#[must_use]
pub fn onboarding_path(role: Role) -> Option<&'static str> {
    match role {
        Role::Customer => Some(CUSTOMER_ONBOARDING_PATH),
        Role::Provider => Some(PROVIDER_ONBOARDING_PATH),
        Role::Admin => None,
    }
}

/// Drop query/fragment and trailing slashes. Empty input is the root.
#[must_use]
pub fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { ROOT_PATH } else { trimmed }
}

/// Segment-aware prefix test: `/dashboard` covers `/dashboard/x`, not `/dashboards`.
fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Pages that require a signed-in user.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    let path = normalize(path);
    is_under(path, DASHBOARD_PREFIX) || is_under(path, ONBOARDING_PREFIX) || path == ROLE_SELECTION_PATH
}

/// Pages a fully onboarded user is bounced off of, toward their dashboard.
fn is_entry_page(path: &str) -> bool {
    path == ROOT_PATH || is_under(path, AUTH_PREFIX) || is_under(path, ONBOARDING_PREFIX)
}

/// Compute the single redirect required for `path`, or `None` to stay.
#[must_use]
pub fn decide(path: &str, snapshot: &AuthSnapshot) -> Option<Destination> {
    if snapshot.loading {
        return None;
    }

    let path = normalize(path);

    if snapshot.identity.is_none() {
        return is_protected(path).then_some(Destination::SignIn);
    }

    let Some(profile) = snapshot.profile.as_ref() else {
        return (path != ROLE_SELECTION_PATH).then_some(Destination::RoleSelection);
    };
    let Some(role) = profile.role else {
        return (path != ROLE_SELECTION_PATH).then_some(Destination::RoleSelection);
    };

    if !profile.is_complete() {
        return match onboarding_path(role) {
            Some(target) if !is_under(path, target) => Some(Destination::Onboarding(role)),
            _ => None,
        };
    }

    is_entry_page(path).then_some(Destination::Dashboard(role))
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
