//! Application configuration parsed from environment variables.
//!
//! `main` loads an optional `.env` file first; every value then comes from
//! the process environment. Parsing goes through a lookup function so the
//! rules can be exercised without touching global state.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Which backend implementation serves identity and data calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// The hosted backend-as-a-service over HTTP.
    Hosted,
    /// Process-local tables; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedConfig {
    /// Base URL without trailing slash, e.g. `https://xyz.example.co`.
    pub base_url: String,
    /// Public (anon) API key sent as `apikey` on every request.
    pub anon_key: String,
    pub timeouts: BackendTimeouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub mode: BackendMode,
    /// Present iff `mode` is `Hosted`.
    pub hosted: Option<HostedConfig>,
    pub port: u16,
    pub cookie_secure: bool,
    pub currency_symbol: String,
}

impl AppConfig {
    /// Build typed config from the process environment.
    ///
    /// Required when `BACKEND_MODE` is `hosted` (the default):
    /// - `BACKEND_URL`
    /// - `BACKEND_ANON_KEY`
    ///
    /// Optional:
    /// - `BACKEND_MODE`: `hosted` (default) or `memory`
    /// - `BACKEND_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BACKEND_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORT`: default 3000
    /// - `COOKIE_SECURE`: inferred from an `https` backend URL when absent
    /// - `CURRENCY_SYMBOL`: default `$`
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = parse_mode(lookup("BACKEND_MODE").as_deref())?;

        let hosted = match mode {
            BackendMode::Memory => None,
            BackendMode::Hosted => {
                let base_url = lookup("BACKEND_URL")
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(ConfigError::Missing("BACKEND_URL"))?
                    .trim()
                    .trim_end_matches('/')
                    .to_owned();
                let anon_key = lookup("BACKEND_ANON_KEY")
                    .filter(|v| !v.trim().is_empty())
                    .ok_or(ConfigError::Missing("BACKEND_ANON_KEY"))?;
                let timeouts = BackendTimeouts {
                    request_secs: parse_or(
                        &lookup,
                        "BACKEND_REQUEST_TIMEOUT_SECS",
                        DEFAULT_REQUEST_TIMEOUT_SECS,
                    )?,
                    connect_secs: parse_or(
                        &lookup,
                        "BACKEND_CONNECT_TIMEOUT_SECS",
                        DEFAULT_CONNECT_TIMEOUT_SECS,
                    )?,
                };
                Some(HostedConfig { base_url, anon_key, timeouts })
            }
        };

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { var: "COOKIE_SECURE", value: raw })?,
            None => hosted
                .as_ref()
                .is_some_and(|h| h.base_url.starts_with("https://")),
        };

        let currency_symbol = lookup("CURRENCY_SYMBOL")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY_SYMBOL.to_owned());

        Ok(Self { mode, hosted, port, cookie_secure, currency_symbol })
    }

    /// In-memory configuration used for local development and tests.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            mode: BackendMode::Memory,
            hosted: None,
            port: DEFAULT_PORT,
            cookie_secure: false,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
        }
    }
}

fn parse_mode(raw: Option<&str>) -> Result<BackendMode, ConfigError> {
    match raw.map(str::trim).unwrap_or("hosted") {
        "hosted" => Ok(BackendMode::Hosted),
        "memory" => Ok(BackendMode::Memory),
        other => Err(ConfigError::Invalid { var: "BACKEND_MODE", value: other.to_owned() }),
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
