use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn hosted_defaults() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
        ("BACKEND_URL", "https://abc.backend.example/"),
        ("BACKEND_ANON_KEY", "anon"),
    ]))
    .unwrap();

    assert_eq!(cfg.mode, BackendMode::Hosted);
    let hosted = cfg.hosted.unwrap();
    assert_eq!(hosted.base_url, "https://abc.backend.example");
    assert_eq!(hosted.anon_key, "anon");
    assert_eq!(
        hosted.timeouts,
        BackendTimeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert!(cfg.cookie_secure, "https backend should imply secure cookies");
    assert_eq!(cfg.currency_symbol, "$");
}

#[test]
fn hosted_requires_url() {
    let err = AppConfig::from_lookup(lookup_from(&[("BACKEND_ANON_KEY", "anon")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("BACKEND_URL"));
}

#[test]
fn hosted_requires_anon_key() {
    let err = AppConfig::from_lookup(lookup_from(&[("BACKEND_URL", "http://localhost:54321")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("BACKEND_ANON_KEY"));
}

#[test]
fn memory_mode_needs_no_backend_vars() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("BACKEND_MODE", "memory")])).unwrap();
    assert_eq!(cfg.mode, BackendMode::Memory);
    assert!(cfg.hosted.is_none());
    assert!(!cfg.cookie_secure);
}

#[test]
fn overrides_are_parsed() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
        ("BACKEND_URL", "http://localhost:54321"),
        ("BACKEND_ANON_KEY", "anon"),
        ("BACKEND_REQUEST_TIMEOUT_SECS", "5"),
        ("BACKEND_CONNECT_TIMEOUT_SECS", "2"),
        ("PORT", "8080"),
        ("COOKIE_SECURE", "yes"),
        ("CURRENCY_SYMBOL", "₹"),
    ]))
    .unwrap();

    assert_eq!(cfg.hosted.unwrap().timeouts, BackendTimeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(cfg.port, 8080);
    assert!(cfg.cookie_secure);
    assert_eq!(cfg.currency_symbol, "₹");
}

#[test]
fn invalid_port_errors() {
    let err = AppConfig::from_lookup(lookup_from(&[("BACKEND_MODE", "memory"), ("PORT", "eighty")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "PORT", value: "eighty".into() });
}

#[test]
fn unknown_mode_errors() {
    let err = AppConfig::from_lookup(lookup_from(&[("BACKEND_MODE", "sqlite")])).unwrap_err();
    assert!(err.to_string().contains("BACKEND_MODE"));
}

#[test]
fn invalid_cookie_secure_errors() {
    let err =
        AppConfig::from_lookup(lookup_from(&[("BACKEND_MODE", "memory"), ("COOKIE_SECURE", "maybe")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "COOKIE_SECURE", value: "maybe".into() });
}

#[test]
fn blank_currency_falls_back_to_default() {
    let cfg =
        AppConfig::from_lookup(lookup_from(&[("BACKEND_MODE", "memory"), ("CURRENCY_SYMBOL", "  ")])).unwrap();
    assert_eq!(cfg.currency_symbol, DEFAULT_CURRENCY_SYMBOL);
}

#[test]
fn parse_bool_variants() {
    for raw in ["1", "true", "YES", " On "] {
        assert_eq!(parse_bool(raw), Some(true), "expected true for {raw:?}");
    }
    for raw in ["0", "false", "No", "off"] {
        assert_eq!(parse_bool(raw), Some(false), "expected false for {raw:?}");
    }
    assert_eq!(parse_bool(""), None);
}
