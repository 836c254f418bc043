use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub max_concurrent_requests: usize,
    pub fetch_retry_delay_ms: u64,
    pub max_body_bytes: usize,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data.db".to_string()),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("BACKEND_PORT", 8080),
            api_key: env::var("API_KEY")?,
            max_concurrent_requests: parse_or("MAX_CONCURRENT_REQUESTS", 5),
            fetch_retry_delay_ms: parse_or("FETCH_RETRY_DELAY_MS", 1000),
            max_body_bytes: parse_or("MAX_BODY_BYTES", 1024 * 1024),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 15),
        })
    }

    pub fn fetch_retry_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Read and parse an optional variable, falling back on absence or parse failure.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
