//! Application configuration loaded from environment variables.

use catalog::CatalogConfig;
use notifications::DispatcherConfig;
use notifications::handlers::DEFAULT_HISTORY_CAPACITY;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `NOTIFY_HISTORY_CAPACITY` — audit entries and stock alerts kept in
///   memory, oldest evicted first (default: `10000`)
///
/// Dispatcher and catalog settings are read by their own `from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub history_capacity: usize,
    pub dispatcher: DispatcherConfig,
    pub catalog: CatalogConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            history_capacity: std::env::var("NOTIFY_HISTORY_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_CAPACITY),
            dispatcher: DispatcherConfig::from_env(),
            catalog: CatalogConfig::from_env(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            dispatcher: DispatcherConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}
