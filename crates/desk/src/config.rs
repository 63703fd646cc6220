//! Desk configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `DESK_HOST` - Bind address (default: 127.0.0.1)
//! - `DESK_PORT` - Listen port (default: 3002)
//! - `DESK_BASE_URL` - Public URL (default: <http://localhost:3002>)
//! - `DESK_IDLE_MINUTES` - Minutes before an idle desk is dropped (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (backend - both or neither)
//! - `SUPABASE_URL` - Project URL (e.g., <https://abc.supabase.co>)
//! - `SUPABASE_ANON_KEY` - Public anon key
//!
//! Without the backend pair the desk still starts, but the login form is
//! disabled.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Desk application configuration.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; `https://` turns on secure cookies
    pub base_url: String,
    /// How long an untouched desk stays in memory
    pub desk_idle: Duration,
    /// Backend connection, if configured
    pub gateway: Option<GatewayConfig>,
    /// Why the backend is off, when it is
    pub gateway_disabled: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Supabase project connection.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Project URL
    pub url: Url,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: SecretString,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl GatewayConfig {
    /// Build from the two raw values.
    ///
    /// Both must be present and the URL must parse; otherwise the error says
    /// which. The URL path always ends in `/` so endpoint paths join under it.
    fn from_parts(url: Option<String>, anon_key: Option<String>) -> Result<Self, String> {
        match (url, anon_key) {
            (Some(url), Some(key)) => {
                let mut url = Url::parse(&url)
                    .map_err(|e| format!("SUPABASE_URL is not a valid URL ({e})"))?;
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
                Ok(Self {
                    url,
                    anon_key: SecretString::from(key),
                })
            }
            (None, None) => Err("SUPABASE_URL and SUPABASE_ANON_KEY not set".to_string()),
            _ => Err("SUPABASE_URL and SUPABASE_ANON_KEY must be set together".to_string()),
        }
    }

    fn from_env() -> Result<Self, String> {
        Self::from_parts(
            get_optional_env("SUPABASE_URL"),
            get_optional_env("SUPABASE_ANON_KEY"),
        )
    }
}

impl DeskConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if host, port or idle minutes fail to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("DESK_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DESK_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("DESK_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DESK_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("DESK_BASE_URL", "http://localhost:3002");
        let desk_idle = parse_idle_minutes(&get_env_or_default("DESK_IDLE_MINUTES", "60"))?;

        // Logged by the binary once tracing is up.
        let (gateway, gateway_disabled) = match GatewayConfig::from_env() {
            Ok(gateway) => (Some(gateway), None),
            Err(reason) => (None, Some(reason)),
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            desk_idle,
            gateway,
            gateway_disabled,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Configuration for tests and local demos: loopback, no backend, no Sentry.
    #[must_use]
    pub fn local() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3002,
            base_url: "http://localhost:3002".to_string(),
            desk_idle: Duration::from_secs(60 * 60),
            gateway: None,
            gateway_disabled: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Idle timeout from a whole number of minutes, at least one.
fn parse_idle_minutes(raw: &str) -> Result<Duration, ConfigError> {
    let invalid =
        |reason: String| ConfigError::InvalidEnvVar("DESK_IDLE_MINUTES".to_string(), reason);

    let minutes = raw.trim().parse::<u64>().map_err(|e| invalid(e.to_string()))?;
    if minutes == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    let seconds = minutes
        .checked_mul(60)
        .ok_or_else(|| invalid("too large".to_string()))?;
    Ok(Duration::from_secs(seconds))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
