//! Identity, session and profile types.
//!
//! Role tags arrive from the backend as free-form strings (`technician` and
//! `provider` both occur). They are folded into [`Role`] here and nowhere else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;
const MAX_NAME_LEN: usize = 120;

// =============================================================================
// ROLE
// =============================================================================

/// Application role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Customer,
    /// Repair technician. Stored as `technician`, routed as `provider`.
    Provider,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Provider, Role::Admin];

    /// Canonical wire tag written back to the backend.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Provider => "technician",
            Self::Admin => "admin",
        }
    }

    /// Path segment used for this role's dashboard and onboarding pages.
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Provider => "provider",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "technician" | "provider" => Ok(Self::Provider),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRole(raw.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Profile rows may carry tags this build does not know; those read as "no role".
fn deserialize_lenient_role<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Role>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|tag| match tag.parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            if !tag.trim().is_empty() {
                tracing::warn!(role = %tag, "ignoring unrecognized profile role");
            }
            None
        }
    }))
}

// =============================================================================
// VALIDATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a valid email address is required")]
    InvalidEmail,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("phone number must contain 7 to 15 digits")]
    InvalidPhone,
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Strip formatting from a phone number, keeping a leading `+`.
fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    for c in trimmed.chars() {
        match c {
            '0'..='9' => out.push(c),
            '+' | ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(ValidationError::InvalidPhone),
        }
    }
    let digits = out.trim_start_matches('+').len();
    if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        Ok(out)
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

fn optional_text(value: Option<String>, field: &'static str) -> Result<Option<String>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong { field, max: MAX_NAME_LEN });
    }
    Ok(Some(value.to_owned()))
}

// =============================================================================
// IDENTITY + SESSION
// =============================================================================

/// Authenticated principal as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Backend session: identity plus the tokens that authorize data calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: Identity,
}

impl Session {
    /// Refresh this many seconds before the backend would reject the token.
    pub const EXPIRY_LEEWAY_SECS: i64 = 30;

    #[must_use]
    pub fn is_expired(&self, now_unix: i64) -> bool {
        now_unix + Self::EXPIRY_LEEWAY_SECS >= self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Email + password pair for sign-in and sign-up.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Build credentials, trimming the email and rejecting obviously bad input
    /// before it reaches the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a missing `@`-address or empty password.
    pub fn new(email: &str, password: &str) -> Result<Self, ValidationError> {
        let email = email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(ValidationError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(Self { email: email.to_owned(), password: password.to_owned() })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Application-level user record. Mirrors the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default, deserialize_with = "deserialize_lenient_role")]
    pub role: Option<Role>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub onboarding_complete: Option<bool>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Empty profile row, as created by the backend at sign-up.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            role: None,
            phone: None,
            onboarding_complete: None,
            full_name: None,
            city: None,
            avatar_url: None,
        }
    }

    /// Whether onboarding is finished.
    ///
    /// A non-blank phone number is required. Rows written by onboarding also
    /// carry an explicit flag, which can only mark a row incomplete: a
    /// `false` flag sends the user back to onboarding even with a phone on
    /// file, while a `true` flag without a phone does not count.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let has_phone = self.phone.as_deref().is_some_and(|p| !p.trim().is_empty());
        has_phone && self.onboarding_complete != Some(false)
    }
}

/// Partial profile write. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_complete: Option<bool>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn role(role: Role) -> Self {
        Self { role: Some(role), ..Self::default() }
    }

    /// Apply the set fields to a profile row.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(role) = self.role {
            profile.role = Some(role);
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(name) = &self.full_name {
            profile.full_name = Some(name.clone());
        }
        if let Some(city) = &self.city {
            profile.city = Some(city.clone());
        }
        if let Some(done) = self.onboarding_complete {
            profile.onboarding_complete = Some(done);
        }
    }
}

/// Contact details collected on the onboarding pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingDetails {
    pub phone: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl OnboardingDetails {
    /// Validate and turn into the profile write that completes onboarding.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for a malformed phone or oversized text.
    pub fn into_update(self) -> Result<ProfileUpdate, ValidationError> {
        Ok(ProfileUpdate {
            role: None,
            phone: Some(normalize_phone(&self.phone)?),
            full_name: optional_text(self.full_name, "full_name")?,
            city: optional_text(self.city, "city")?,
            onboarding_complete: Some(true),
        })
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Everything the navigation guard reads: identity, profile, loading flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl AuthSnapshot {
    /// State before the initial session check resolves.
    #[must_use]
    pub fn loading() -> Self {
        Self { identity: None, profile: None, loading: true }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { identity: None, profile: None, loading: false }
    }

    #[must_use]
    pub fn signed_in(identity: Identity, profile: Option<Profile>) -> Self {
        Self { identity: Some(identity), profile, loading: false }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().and_then(|p| p.role)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.identity.as_ref().map(|i| i.id)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
