//! Configuration management for StudyHall services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Guest-mode local store configuration
    pub local_store: LocalStoreConfig,

    /// AI gateway configuration
    pub ai: AiConfig,

    /// Billing provider configuration
    pub billing: BillingConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration (stub, disabled by default)
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
pub struct LocalStoreConfig {
    /// Directory holding guest collection files
    #[serde(default = "default_local_store_dir")]
    pub data_dir: String,

    /// Directory holding uploaded files awaiting extraction
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// API key for the AI gateway
    pub api_key: Option<String>,

    /// API base URL (OpenAI-compatible)
    #[serde(default = "default_ai_base")]
    pub api_base: String,

    /// Text-generation model
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Vision-capable model for text extraction
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Image-generation model for comic panels
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Language the assistant responds in
    #[serde(default = "default_language")]
    pub language: String,

    /// Request timeout in seconds
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient upstream failures
    #[serde(default = "default_ai_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingConfig {
    /// Provider secret API key
    pub secret_key: Option<String>,

    /// Webhook signing secret
    pub webhook_secret: Option<String>,

    /// Provider API base URL
    #[serde(default = "default_billing_base")]
    pub api_base: String,

    /// Price identifier for the essential tier
    pub price_essential: Option<String>,

    /// Price identifier for the pro tier
    pub price_pro: Option<String>,

    /// Price identifier for the ultimate tier
    pub price_ultimate: Option<String>,

    /// Redirect target after successful checkout
    #[serde(default = "default_checkout_success_url")]
    pub checkout_success_url: String,

    /// Redirect target after cancelled checkout
    #[serde(default = "default_checkout_cancel_url")]
    pub checkout_cancel_url: String,

    /// Return URL for the billing portal
    #[serde(default = "default_portal_return_url")]
    pub portal_return_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token validation
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// Guest context header name
    #[serde(default = "default_guest_header")]
    pub guest_header: String,

    /// Request ID header name
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
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
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_local_store_dir() -> String { "data/guest".to_string() }
fn default_uploads_dir() -> String { "data/uploads".to_string() }
fn default_ai_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_text_model() -> String { "gpt-4o-mini".to_string() }
fn default_vision_model() -> String { "gpt-4o".to_string() }
fn default_image_model() -> String { "dall-e-3".to_string() }
fn default_language() -> String { "en".to_string() }
fn default_ai_timeout() -> u64 { 90 }
fn default_ai_retries() -> u32 { 2 }
fn default_billing_base() -> String { "https://api.stripe.com/v1".to_string() }
fn default_checkout_success_url() -> String { "http://localhost:3000/settings?checkout=success".to_string() }
fn default_checkout_cancel_url() -> String { "http://localhost:3000/settings?checkout=cancelled".to_string() }
fn default_portal_return_url() -> String { "http://localhost:3000/settings".to_string() }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_guest_header() -> String { "X-Guest-Id".to_string() }
fn default_request_id_header() -> String { "X-Request-ID".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "studyhall".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }

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
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
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
                    .try_parsing(true)
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
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/studyhall".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            local_store: LocalStoreConfig {
                data_dir: default_local_store_dir(),
                uploads_dir: default_uploads_dir(),
            },
            ai: AiConfig {
                api_key: None,
                api_base: default_ai_base(),
                text_model: default_text_model(),
                vision_model: default_vision_model(),
                image_model: default_image_model(),
                language: default_language(),
                timeout_secs: default_ai_timeout(),
                max_retries: default_ai_retries(),
            },
            billing: BillingConfig {
                secret_key: None,
                webhook_secret: None,
                api_base: default_billing_base(),
                price_essential: None,
                price_pro: None,
                price_ultimate: None,
                checkout_success_url: default_checkout_success_url(),
                checkout_cancel_url: default_checkout_cancel_url(),
                portal_return_url: default_portal_return_url(),
            },
            auth: AuthConfig {
                jwt_secret: None,
                jwt_expiration_secs: default_jwt_expiration(),
                guest_header: default_guest_header(),
                request_id_header: default_request_id_header(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_rate_limit(),
                burst: default_burst(),
                enabled: false,
            },
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
        assert_eq!(config.ai.text_model, "gpt-4o-mini");
        assert_eq!(config.auth.guest_header, "X-Guest-Id");
    }

    #[test]
    fn test_rate_limit_stub_disabled_by_default() {
        let config = AppConfig::default();
        assert!(!config.rate_limit.enabled);
    }
}
