//! Configuration management for Lectorate services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values
//!
//! The resulting `AppConfig` is built once at process start and passed
//! by reference through application state; there is no global singleton.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Submission quota configuration (rolling windows)
    #[serde(default)]
    pub quotas: QuotaConfig,

    /// Comment text validation configuration
    #[serde(default)]
    pub comments: CommentConfig,

    /// Weighted score configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Achievement collaborator configuration
    #[serde(default)]
    pub achievements: AchievementConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Transport-level rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret used to validate bearer tokens from the identity service
    pub jwt_secret: Option<String>,

    /// Token expiration in seconds (used when minting test tokens)
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

/// Rolling-window submission quotas
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Maximum comments per user inside the global window
    #[serde(default = "default_comment_limit")]
    pub comment_limit: u32,

    /// Global window length in months
    #[serde(default = "default_comment_frequency_months")]
    pub comment_frequency_months: u32,

    /// Maximum comments per user per lecturer inside the per-lecturer window
    #[serde(default = "default_comment_to_lecturer_limit")]
    pub comment_to_lecturer_limit: u32,

    /// Per-lecturer window length in months
    #[serde(default = "default_comment_lecturer_frequency_months")]
    pub comment_lecturer_frequency_months: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommentConfig {
    /// Maximum comment text length in characters
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Prior weight pulling low-evidence lecturers toward the global mean
    #[serde(default = "default_mean_mark_general_weight")]
    pub mean_mark_general_weight: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AchievementConfig {
    /// Base URL of the achievement service; disabled when absent
    pub api_url: Option<String>,

    /// Authorization token for awarding achievements
    pub give_token: Option<String>,

    /// Identifier of the "first comment" achievement
    pub first_comment_achievement_id: Option<i64>,

    /// Request timeout in seconds
    #[serde(default = "default_achievement_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (per process)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_comment_limit() -> u32 { 20 }
fn default_comment_frequency_months() -> u32 { 10 }
fn default_comment_to_lecturer_limit() -> u32 { 5 }
fn default_comment_lecturer_frequency_months() -> u32 { 6 }
fn default_max_comment_length() -> usize { 3000 }
fn default_mean_mark_general_weight() -> f64 { 0.75 }
fn default_achievement_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "lectorate".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            comment_limit: default_comment_limit(),
            comment_frequency_months: default_comment_frequency_months(),
            comment_to_lecturer_limit: default_comment_to_lecturer_limit(),
            comment_lecturer_frequency_months: default_comment_lecturer_frequency_months(),
        }
    }
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            max_comment_length: default_max_comment_length(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mean_mark_general_weight: default_mean_mark_general_weight(),
        }
    }
}

impl Default for AchievementConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            give_token: None,
            first_comment_achievement_id: None,
            timeout_secs: default_achievement_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__QUOTAS__COMMENT_LIMIT=20
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/lectorate".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            auth: AuthConfig::default(),
            quotas: QuotaConfig::default(),
            comments: CommentConfig::default(),
            scoring: ScoringConfig::default(),
            achievements: AchievementConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.quotas.comment_limit, 20);
        assert_eq!(config.quotas.comment_frequency_months, 10);
        assert_eq!(config.quotas.comment_to_lecturer_limit, 5);
        assert_eq!(config.quotas.comment_lecturer_frequency_months, 6);
    }

    #[test]
    fn test_server_bind_and_shutdown_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert!(config.request_timeout() > Duration::ZERO);
    }

    #[test]
    fn test_default_scoring_weight() {
        let config = AppConfig::default();
        assert!((config.scoring.mean_mark_general_weight - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.comments.max_comment_length, 3000);
    }
}
