//! Configuration for maildrip

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Email transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Delivery credential configuration
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the admin/API listener
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Campaign store backend: "postgres" or "memory"
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// Database URL (for postgres)
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_db_backend() -> String {
    "memory".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Scheduler configuration
///
/// Defaults match the delivery policy: three attempts, five minutes
/// between attempts, a 24 hour delivery window, one pass per minute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between dispatch passes (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum delivery attempts per campaign
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum wait between attempts for the same campaign (seconds)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Maximum time past the scheduled moment a send may still be attempted (seconds)
    #[serde(default = "default_expiry_window")]
    pub expiry_window_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            expiry_window_secs: default_expiry_window(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    300
}

fn default_expiry_window() -> u64 {
    86400
}

/// Email transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Batch send endpoint of the remote email service
    #[serde(default = "default_transport_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_transport_timeout")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: default_transport_endpoint(),
            timeout_secs: default_transport_timeout(),
        }
    }
}

fn default_transport_endpoint() -> String {
    "http://localhost:8025/api/v1/send".to_string()
}

fn default_transport_timeout() -> u64 {
    30
}

/// Delivery credential configuration
///
/// Token refresh is owned by the auth subsystem; the engine only reads
/// the current token and its expiry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Access token presented to the email transport
    #[serde(default)]
    pub access_token: String,

    /// Token expiry; absent means the token does not expire
    pub expires_at: Option<DateTime<Utc>>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from the default locations, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./maildrip.toml"),
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/maildrip/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scheduler.poll_interval_secs, 60);
        assert_eq!(config.scheduler.max_attempts, 3);
        assert_eq!(config.scheduler.retry_delay_secs, 300);
        assert_eq!(config.scheduler.expiry_window_secs, 86400);
        assert_eq!(config.database.backend, "memory");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
port = 9090

[database]
backend = "postgres"
url = "postgres://localhost/maildrip"

[scheduler]
poll_interval_secs = 15

[transport]
endpoint = "https://mail.example.com/send"
timeout_secs = 10

[credentials]
access_token = "ya29.test"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.backend, "postgres");
        assert_eq!(config.scheduler.poll_interval_secs, 15);
        assert_eq!(config.scheduler.max_attempts, 3);
        assert_eq!(config.transport.endpoint, "https://mail.example.com/send");
        assert_eq!(config.credentials.access_token, "ya29.test");
        assert!(config.credentials.expires_at.is_none());
    }
}
