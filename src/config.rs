//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub connections: ConnectionsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "connecthub.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public base URL
    ///
    /// # Returns
    /// Full URL like "https://connecthub.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Session token configuration
///
/// Tokens are issued by the identity provider and signed with the shared
/// `session_secret`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Cookie carrying the session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_cookie_name() -> String {
    "session".to_string()
}

/// Interest and hobby matching
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Result size when the caller gives no `limit`
    pub default_limit: usize,
    /// Upper bound on any requested `limit`
    pub max_limit: usize,
    /// Junction rows fetched per requested interest match
    pub interest_overfetch_factor: usize,
    /// Junction rows fetched per requested hobby match
    pub hobby_overfetch_factor: usize,
    /// Return each match's full interest/hobby list as `all*` instead of
    /// repeating the shared list
    pub include_full_interest_list: bool,
    /// Only match hobby rows flagged `is_looking_for_partners`
    pub hobby_partners_only: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
            interest_overfetch_factor: 10,
            hobby_overfetch_factor: 3,
            include_full_interest_list: false,
            hobby_partners_only: false,
        }
    }
}

impl DiscoveryConfig {
    /// Clamp a requested limit into `1..=max_limit`; zero means unset.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|limit| *limit > 0)
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// Connection request policy
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConnectionsConfig {
    /// Let a declined pair be requested again
    pub allow_rerequest_after_decline: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CONNECTHUB__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/connecthub.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.cookie_name", "session")?
            .set_default("discovery.default_limit", 10)?
            .set_default("discovery.max_limit", 50)?
            .set_default("discovery.interest_overfetch_factor", 10)?
            .set_default("discovery.hobby_overfetch_factor", 3)?
            .set_default("discovery.include_full_interest_list", false)?
            .set_default("discovery.hobby_partners_only", false)?
            .set_default("connections.allow_rerequest_after_decline", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("CONNECTHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.discovery.default_limit == 0 || self.discovery.max_limit == 0 {
            return Err(crate::error::AppError::Config(
                "discovery limits must be greater than 0".to_string(),
            ));
        }

        if self.discovery.interest_overfetch_factor == 0
            || self.discovery.hobby_overfetch_factor == 0
        {
            return Err(crate::error::AppError::Config(
                "discovery overfetch factors must be at least 1".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
