//! Application configuration loaded from environment variables.
//!
//! Loading is fail-fast: a missing required variable or a malformed optional
//! one stops startup with a clear message.

use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use riskgate_client::{HttpClientConfig, RetryPolicy};
use riskgate_sync::paginate::Paginator;
use riskgate_sync::{SyncConfig, TierLists};
use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

impl ConfigError {
    fn invalid(var: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            var: var.to_string(),
            message: message.into(),
        }
    }
}

/// Base URL and bearer token for one remote API.
#[derive(Clone)]
pub struct ApiEndpoint {
    pub base_url: String,
    pub token: String,
}

impl std::fmt::Debug for ApiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEndpoint")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rust_log: String,

    pub risk_api: ApiEndpoint,
    pub list_api: ApiEndpoint,
    pub lists: TierLists,

    /// Time between scheduled cycles.
    pub sync_interval: Duration,
    pub scheduler_enabled: bool,

    pub risk_page_size: u32,
    pub list_page_size: u32,
    pub page_delay: Duration,

    pub http_timeout: Duration,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub retry_base_delay: Duration,

    pub propagation_delay: Duration,
    pub verify_after_write: bool,
    pub lease_ttl: Duration,

    /// PostgreSQL snapshot backend when set; in-memory otherwise.
    pub database_url: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or any value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or any value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let lists = TierLists::new(
            vars.required("LIST_ID_LOW")?,
            vars.required("LIST_ID_MEDIUM")?,
            vars.required("LIST_ID_HIGH")?,
        );
        let distinct: HashSet<&str> = [&lists.low, &lists.medium, &lists.high]
            .into_iter()
            .map(String::as_str)
            .collect();
        if distinct.len() != 3 {
            return Err(ConfigError::invalid(
                "LIST_ID_LOW/LIST_ID_MEDIUM/LIST_ID_HIGH",
                "each tier needs its own list",
            ));
        }

        let config = Self {
            host: vars.optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: vars.parse("PORT", 8080)?,
            rust_log: vars
                .optional("RUST_LOG")
                .unwrap_or_else(|| "info,riskgate=debug".to_string()),
            risk_api: ApiEndpoint {
                base_url: vars.required("RISK_API_BASE_URL")?,
                token: vars.required("RISK_API_TOKEN")?,
            },
            list_api: ApiEndpoint {
                base_url: vars.required("LIST_API_BASE_URL")?,
                token: vars.required("LIST_API_TOKEN")?,
            },
            lists,
            sync_interval: Duration::from_secs(vars.parse("SYNC_INTERVAL_SECS", 300)?),
            scheduler_enabled: vars.flag("SCHEDULER_ENABLED", true)?,
            risk_page_size: vars.parse("RISK_PAGE_SIZE", 100)?,
            list_page_size: vars.parse("LIST_PAGE_SIZE", 100)?,
            page_delay: Duration::from_millis(vars.parse("PAGE_DELAY_MS", 50)?),
            http_timeout: Duration::from_secs(vars.parse("HTTP_TIMEOUT_SECS", 30)?),
            max_attempts: vars.parse("MAX_ATTEMPTS", 3)?,
            retry_base_delay: Duration::from_millis(vars.parse("RETRY_BASE_DELAY_MS", 1000)?),
            propagation_delay: Duration::from_millis(vars.parse("PROPAGATION_DELAY_MS", 2000)?),
            verify_after_write: vars.flag("VERIFY_AFTER_WRITE", true)?,
            lease_ttl: Duration::from_secs(vars.parse("LEASE_TTL_SECS", 900)?),
            database_url: vars.optional("DATABASE_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_interval.is_zero() {
            return Err(ConfigError::invalid("SYNC_INTERVAL_SECS", "must be at least 1"));
        }
        if self.risk_page_size == 0 {
            return Err(ConfigError::invalid("RISK_PAGE_SIZE", "must be at least 1"));
        }
        if self.list_page_size == 0 {
            return Err(ConfigError::invalid("LIST_PAGE_SIZE", "must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("MAX_ATTEMPTS", "must be at least 1"));
        }
        if self.lease_ttl.is_zero() {
            return Err(ConfigError::invalid("LEASE_TTL_SECS", "must be at least 1"));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_base_delay)
    }

    #[must_use]
    pub fn risk_client_config(&self) -> HttpClientConfig {
        HttpClientConfig::new(&self.risk_api.base_url, &self.risk_api.token)
            .with_timeout(self.http_timeout)
            .with_retry(self.retry_policy())
    }

    #[must_use]
    pub fn list_client_config(&self) -> HttpClientConfig {
        HttpClientConfig::new(&self.list_api.base_url, &self.list_api.token)
            .with_timeout(self.http_timeout)
            .with_retry(self.retry_policy())
    }

    /// Engine settings derived from this configuration.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        let mut sync = SyncConfig::new(self.lists.clone());
        sync.risk_pagination = Paginator {
            page_size: self.risk_page_size,
            inter_page_delay: self.page_delay,
            ..Paginator::risk_scores()
        };
        sync.list_pagination = Paginator {
            page_size: self.list_page_size,
            inter_page_delay: self.page_delay,
            ..Paginator::list_items()
        };
        sync.verify_after_write = self.verify_after_write;
        sync.propagation_delay = self.propagation_delay;
        sync.lease_ttl = self.lease_ttl;
        sync
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Present and non-blank.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
    }

    fn parse<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::invalid(name, format!("'{raw}': {e}"))),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name).map(|v| v.to_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::invalid(name, format!("'{v}' is not a boolean"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("RISK_API_BASE_URL", "https://risk.example.com/v1"),
            ("RISK_API_TOKEN", "risk-token"),
            ("LIST_API_BASE_URL", "https://lists.example.com/v4"),
            ("LIST_API_TOKEN", "list-token"),
            ("LIST_ID_LOW", "list-low"),
            ("LIST_ID_MEDIUM", "list-medium"),
            ("LIST_ID_HIGH", "list-high"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| vars.get(name).map(|v| (*v).to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_vars()).unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.rust_log, "info,riskgate=debug");
        assert_eq!(config.sync_interval, Duration::from_secs(300));
        assert!(config.scheduler_enabled);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.lease_ttl, Duration::from_secs(900));
        assert!(config.database_url.is_none());

        let sync = config.sync_config();
        assert_eq!(sync.risk_pagination.max_pages, 100);
        assert_eq!(sync.list_pagination.max_pages, 50);
        assert_eq!(sync.list_pagination.inter_page_delay, Duration::from_millis(50));
        assert_eq!(sync.propagation_delay, Duration::from_secs(2));
        assert!(sync.verify_after_write);
    }

    #[test]
    fn test_missing_required_var() {
        let mut vars = base_vars();
        vars.remove("LIST_API_TOKEN");

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::MissingVar("LIST_API_TOKEN".to_string())
        );
    }

    #[test]
    fn test_blank_required_var_is_missing() {
        let mut vars = base_vars();
        vars.insert("RISK_API_TOKEN", "   ");

        assert!(matches!(load(&vars), Err(ConfigError::MissingVar(_))));
    }

    #[test]
    fn test_malformed_number() {
        let mut vars = base_vars();
        vars.insert("PORT", "eighty");

        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "PORT"));
    }

    #[test]
    fn test_malformed_flag() {
        let mut vars = base_vars();
        vars.insert("VERIFY_AFTER_WRITE", "maybe");

        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidValue { ref var, .. }) if var == "VERIFY_AFTER_WRITE"
        ));
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_vars();
        vars.insert("SCHEDULER_ENABLED", "false");
        vars.insert("MAX_ATTEMPTS", "5");
        vars.insert("LIST_PAGE_SIZE", "25");
        vars.insert("DATABASE_URL", "postgres://localhost/riskgate");

        let config = load(&vars).unwrap();

        assert!(!config.scheduler_enabled);
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.sync_config().list_pagination.page_size, 25);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/riskgate")
        );
    }

    #[test]
    fn test_list_ids_must_be_distinct() {
        let mut vars = base_vars();
        vars.insert("LIST_ID_HIGH", "list-low");

        assert!(matches!(load(&vars), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut vars = base_vars();
        vars.insert("MAX_ATTEMPTS", "0");

        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidValue { ref var, .. }) if var == "MAX_ATTEMPTS"
        ));
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let config = load(&base_vars()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("risk-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
