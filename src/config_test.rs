use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

const BASE: &[(&str, &str)] = &[("BAAS_URL", "https://proj.example.co/"), ("BAAS_ANON_KEY", "anon-123")];

#[test]
fn from_lookup_applies_defaults() {
    let cfg = AppConfig::from_lookup(lookup_from(BASE)).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.backend.url, "https://proj.example.co");
    assert_eq!(cfg.backend.anon_key, "anon-123");
    assert_eq!(cfg.backend.timeouts, Timeouts::default());
    assert!(!cfg.cookie_secure);
}

#[test]
fn from_lookup_parses_overrides() {
    let mut pairs = BASE.to_vec();
    pairs.extend([
        ("PORT", "8080"),
        ("BAAS_REQUEST_TIMEOUT_SECS", "5"),
        ("BAAS_CONNECT_TIMEOUT_SECS", " 2 "),
        ("COOKIE_SECURE", "yes"),
    ]);
    let cfg = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.backend.timeouts, Timeouts { request_secs: 5, connect_secs: 2 });
    assert!(cfg.cookie_secure);
}

#[test]
fn from_lookup_missing_url_errors() {
    let err = AppConfig::from_lookup(lookup_from(&[("BAAS_ANON_KEY", "k")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("BAAS_URL"));
}

#[test]
fn from_lookup_blank_key_counts_as_missing() {
    let err = AppConfig::from_lookup(lookup_from(&[("BAAS_URL", "https://x.example"), ("BAAS_ANON_KEY", "  ")]))
        .unwrap_err();
    assert_eq!(err, ConfigError::Missing("BAAS_ANON_KEY"));
}

#[test]
fn from_lookup_rejects_non_http_url() {
    let err = AppConfig::from_lookup(lookup_from(&[("BAAS_URL", "proj.example.co"), ("BAAS_ANON_KEY", "k")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "BAAS_URL", .. }));
}

#[test]
fn from_lookup_rejects_bad_port() {
    let mut pairs = BASE.to_vec();
    pairs.push(("PORT", "eighty"));
    let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".into() });
}

#[test]
fn cookie_secure_inferred_from_public_url() {
    let mut pairs = BASE.to_vec();
    pairs.push(("PUBLIC_URL", "https://kitchenfix.example"));
    assert!(AppConfig::from_lookup(lookup_from(&pairs)).unwrap().cookie_secure);

    let mut pairs = BASE.to_vec();
    pairs.push(("PUBLIC_URL", "http://localhost:3000"));
    assert!(!AppConfig::from_lookup(lookup_from(&pairs)).unwrap().cookie_secure);
}

#[test]
fn cookie_secure_explicit_value_wins() {
    let mut pairs = BASE.to_vec();
    pairs.extend([("PUBLIC_URL", "https://kitchenfix.example"), ("COOKIE_SECURE", "off")]);
    assert!(!AppConfig::from_lookup(lookup_from(&pairs)).unwrap().cookie_secure);
}

#[test]
fn cookie_secure_garbage_errors() {
    let mut pairs = BASE.to_vec();
    pairs.push(("COOKIE_SECURE", "maybe"));
    assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
}

#[test]
fn parse_bool_variants() {
    for val in ["1", "true", "YES", " On "] {
        assert_eq!(parse_bool(val), Some(true), "{val:?}");
    }
    for val in ["0", "false", "No", "OFF"] {
        assert_eq!(parse_bool(val), Some(false), "{val:?}");
    }
    assert_eq!(parse_bool(""), None);
    assert_eq!(parse_bool("maybe"), None);
}
