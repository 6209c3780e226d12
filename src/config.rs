//! Runtime configuration parsed from environment variables.
//!
//! Parsing goes through a lookup function so tests can feed a map instead of
//! mutating the process environment.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Where the hosted backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL without trailing slash.
    pub url: String,
    /// Public project key sent as the `apikey` header.
    pub anon_key: String,
    pub timeouts: Timeouts,
}

impl BackendConfig {
    #[must_use]
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            url: url.trim().trim_end_matches('/').to_owned(),
            anon_key: anon_key.trim().to_owned(),
            timeouts: Timeouts::default(),
        }
    }

    /// Read `BAAS_URL`, `BAAS_ANON_KEY` and the optional timeout overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required var is missing or a number is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = required(&lookup, "BAAS_URL")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid { key: "BAAS_URL", value: url });
        }
        let anon_key = required(&lookup, "BAAS_ANON_KEY")?;
        let mut config = Self::new(&url, &anon_key);
        config.timeouts = Timeouts {
            request_secs: parse_or(&lookup, "BAAS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_or(&lookup, "BAAS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub backend: BackendConfig,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// Required: `BAAS_URL`, `BAAS_ANON_KEY`.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `BAAS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BAAS_CONNECT_TIMEOUT_SECS`: default 10
    /// - `COOKIE_SECURE`: explicit on/off; otherwise inferred from `PUBLIC_URL`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing required vars or malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = BackendConfig::from_lookup(&lookup)?;
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { key: "COOKIE_SECURE", value: raw })?,
            None => lookup("PUBLIC_URL").is_some_and(|url| url.trim().starts_with("https://")),
        };
        Ok(Self { port, backend, cookie_secure })
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    lookup(key)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
