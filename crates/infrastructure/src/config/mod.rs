//! Application configuration
//!
//! Split into focused sub-modules:
//! - `server`: HTTP server settings
//! - `database`: SQLite database settings
//! - `auth`: JWT signing and tenant claim
//! - `telemetry`: log filtering
//!
//! Sources, later ones winning: built-in defaults, an optional `config.toml`
//! next to the binary, then `RLS__`-prefixed environment variables using `__`
//! as the nesting separator (e.g. `RLS__SERVER__PORT=8080`).

mod auth;
mod database;
mod server;
mod telemetry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use auth::{AuthConfig, DEFAULT_JWT_SECRET};
pub use database::DatabaseConfig;
pub use server::{LogFormat, ServerConfig};
pub use telemetry::TelemetryConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RLS";

/// Nesting separator in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Application environment (development or production)
///
/// Controls security validation strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment - relaxed security warnings
    #[default]
    Development,
    /// Production environment - strict security validation
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!(
                "Invalid environment: {s}. Use 'development' or 'production'"
            )),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development or production)
    ///
    /// In production, critical security warnings prevent startup unless
    /// RLS_ALLOW_INSECURE_CONFIG=true.
    #[serde(default)]
    pub environment: Environment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Bearer token configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from `config.toml` (optional) and the process environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_env(None)
    }

    /// Load configuration, reading environment variables from `env` instead
    /// of the process environment when given
    pub fn load_with_env(
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (e.g., RLS__SERVER__PORT)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true)
                    .source(env),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
