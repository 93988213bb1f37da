//! API configuration

use serde::Deserialize;

/// API configuration
///
/// Every field has a default, so a bare environment still yields a
/// runnable development server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Exchange-rate endpoint; the source currency code is appended as a path segment
    pub exchange_rate_base_url: String,
    pub exchange_rate_timeout_secs: u64,
    /// How long fetched rates and the country list are reused
    pub rate_cache_ttl_secs: u64,
    pub countries_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/expenses".to_string(),
            log_level: "info".to_string(),
            exchange_rate_base_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            exchange_rate_timeout_secs: 5,
            rate_cache_ttl_secs: 3600,
            countries_url: "https://restcountries.com/v3.1/all?fields=name,currencies".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
