//! Application configuration module
//! Loaded once at process start and handed to the services that need it.

use std::env;

pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_BASE_URL: &str = "https://api-m.paypal.com";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub paypal: PaypalConfig,
    pub health: HealthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Selects the PayPal base path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaypalEnvironment {
    Sandbox,
    Live,
}

impl PaypalEnvironment {
    /// Only "live" (any case) selects production; everything else is sandbox.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("live") {
            PaypalEnvironment::Live
        } else {
            PaypalEnvironment::Sandbox
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaypalEnvironment::Sandbox => "test",
            PaypalEnvironment::Live => "live",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            PaypalEnvironment::Sandbox => SANDBOX_BASE_URL,
            PaypalEnvironment::Live => LIVE_BASE_URL,
        }
    }
}

/// PayPal credentials and client settings
#[derive(Clone)]
pub struct PaypalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub environment: PaypalEnvironment,
    pub webhook_id: String,
    pub partner_attribution_id: String,
    pub request_timeout_secs: u64,
    /// Replaces the environment base path (local proxies, tests)
    pub base_url_override: Option<String>,
}

impl std::fmt::Debug for PaypalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaypalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("webhook_id", &self.webhook_id)
            .field("partner_attribution_id", &self.partner_attribution_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("base_url_override", &self.base_url_override)
            .finish()
    }
}

/// Health reporting configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            paypal: PaypalConfig::from_env()?,
            health: HealthConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.paypal.validate()?;
        self.health.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl PaypalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(PaypalConfig {
            client_id: env::var("PAYPAL_CLIENT_ID")
                .map_err(|_| ConfigError::MissingVariable("PAYPAL_CLIENT_ID".to_string()))?,
            client_secret: env::var("PAYPAL_CLIENT_SECRET")
                .map_err(|_| ConfigError::MissingVariable("PAYPAL_CLIENT_SECRET".to_string()))?,
            environment: PaypalEnvironment::parse(
                &env::var("PAYPAL_ENVIRONMENT").unwrap_or_else(|_| "test".to_string()),
            ),
            webhook_id: env::var("PAYPAL_WEBHOOK_ID")
                .map_err(|_| ConfigError::MissingVariable("PAYPAL_WEBHOOK_ID".to_string()))?,
            partner_attribution_id: env::var("PAYPAL_PARTNER_ATTRIBUTION_ID")
                .unwrap_or_else(|_| "commercetools_Cart_Checkout".to_string()),
            request_timeout_secs: env::var("PAYPAL_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("PAYPAL_REQUEST_TIMEOUT_SECS".to_string())
                })?,
            base_url_override: env::var("PAYPAL_BASE_URL").ok(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PAYPAL_CLIENT_ID".to_string()));
        }

        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PAYPAL_CLIENT_SECRET".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PAYPAL_REQUEST_TIMEOUT_SECS".to_string(),
            ));
        }

        if let Some(url) = &self.base_url_override {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(
                    "PAYPAL_BASE_URL must be a valid URL".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.base_url_override
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_else(|| self.environment.base_url())
    }
}

impl HealthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(HealthConfig {
            timeout_ms: env::var("HEALTH_CHECK_TIMEOUT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HEALTH_CHECK_TIMEOUT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "HEALTH_CHECK_TIMEOUT".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
