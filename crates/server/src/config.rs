//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `RESCUEMAP_DATABASE_URL` - SQLite connection string (falls back to `DATABASE_URL`,
//!   then `sqlite://rescuemap.db`)
//! - `RESCUEMAP_HOST` - Bind address (default: 127.0.0.1)
//! - `RESCUEMAP_PORT` - Listen port (default: 5000)
//! - `RESCUEMAP_DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `OVERPASS_URL` - Overpass interpreter endpoint
//! - `NOMINATIM_URL` - Nominatim base URL
//! - `ADRESSE_API_URL` - French government address API base URL
//! - `RESCUEMAP_GEOCODE_TIMEOUT_SECS` - Geocoding request timeout (default: 10)
//! - `RESCUEMAP_OVERPASS_TIMEOUT_SECS` - Overpass request timeout (default: 30)
//! - `RESCUEMAP_USER_AGENT` - User-Agent sent to public map services
//! - `RESCUEMAP_SYNTHETIC_SEED` - Fixed seed for synthetic shop generation
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://rescuemap.db";
const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_ADRESSE_API_URL: &str = "https://api-adresse.data.gouv.fr";
const DEFAULT_USER_AGENT: &str = concat!("rescue-map/", env!("CARGO_PKG_VERSION"));

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite database connection URL
    pub database_url: String,
    /// Maximum pool connections
    pub db_max_connections: u32,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// External map-data and geocoding services
    pub providers: ProviderConfig,
    /// Fixed seed for the synthetic generator (random when unset)
    pub synthetic_seed: Option<u64>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Endpoints and timeouts for outbound calls.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Overpass interpreter endpoint
    pub overpass_url: String,
    /// Nominatim base URL (geocoding provider A)
    pub nominatim_url: String,
    /// Address API base URL (geocoding provider B)
    pub adresse_api_url: String,
    /// Timeout for each geocoding request
    pub geocode_timeout: Duration,
    /// Timeout for each Overpass request
    pub overpass_timeout: Duration,
    /// User-Agent header sent to public services
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            adresse_api_url: DEFAULT_ADRESSE_API_URL.to_string(),
            geocode_timeout: Duration::from_secs(10),
            overpass_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("RESCUEMAP_DATABASE_URL");
        let db_max_connections = get_parsed_or_default("RESCUEMAP_DB_MAX_CONNECTIONS", 5)?;
        let host = get_parsed_or_default("RESCUEMAP_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = get_parsed_or_default("RESCUEMAP_PORT", 5000)?;
        let providers = ProviderConfig::from_env()?;
        let synthetic_seed = get_optional_parsed("RESCUEMAP_SYNTHETIC_SEED")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            db_max_connections,
            host,
            port,
            providers,
            synthetic_seed,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ProviderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            overpass_url: get_env_or_default("OVERPASS_URL", &defaults.overpass_url),
            nominatim_url: get_env_or_default("NOMINATIM_URL", &defaults.nominatim_url),
            adresse_api_url: get_env_or_default("ADRESSE_API_URL", &defaults.adresse_api_url),
            geocode_timeout: Duration::from_secs(get_parsed_or_default(
                "RESCUEMAP_GEOCODE_TIMEOUT_SECS",
                defaults.geocode_timeout.as_secs(),
            )?),
            overpass_timeout: Duration::from_secs(get_parsed_or_default(
                "RESCUEMAP_OVERPASS_TIMEOUT_SECS",
                defaults.overpass_timeout.as_secs(),
            )?),
            user_agent: get_env_or_default("RESCUEMAP_USER_AGENT", &defaults.user_agent),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`, then the local file.
fn get_database_url(primary_key: &str) -> String {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_optional_parsed(key)?.unwrap_or(default))
}

/// Parse an optional environment variable.
fn get_optional_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key)
        .map(|raw| parse_value(key, &raw))
        .transpose()
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_valid() {
        let port: u16 = parse_value("RESCUEMAP_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_value_invalid() {
        let result = parse_value::<u16>("RESCUEMAP_PORT", "eighty");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "RESCUEMAP_PORT"));
    }

    #[test]
    fn test_parse_value_out_of_range() {
        assert!(parse_value::<u16>("RESCUEMAP_PORT", "70000").is_err());
    }

    #[test]
    fn test_provider_defaults() {
        let providers = ProviderConfig::default();
        assert_eq!(providers.overpass_url, DEFAULT_OVERPASS_URL);
        assert_eq!(providers.geocode_timeout, Duration::from_secs(10));
        assert_eq!(providers.overpass_timeout, Duration::from_secs(30));
        assert!(providers.user_agent.starts_with("rescue-map/"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            providers: ProviderConfig::default(),
            synthetic_seed: None,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
    }
}
