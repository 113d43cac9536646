//! Security validation for application configuration
//!
//! Validates configuration for security issues and provides warnings at startup.
//! Critical issues in production will prevent startup unless explicitly allowed.

use std::fmt;

use secrecy::ExposeSecret;

use crate::config::AppConfig;

/// Environment variable that lets a production server start despite critical issues
pub const ALLOW_INSECURE_ENV: &str = "RLS_ALLOW_INSECURE_CONFIG";

/// Shortest HMAC-SHA256 secret accepted without a warning, in bytes
const MIN_SECRET_BYTES: usize = 32;

/// Longest token lifetime accepted without a warning, in minutes
const MAX_EXPIRATION_MINUTES: i64 = 24 * 60;

/// Severity level for security warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WarningSeverity {
    /// Informational - no action required
    Info,
    /// Warning - should be addressed but not critical
    Warning,
    /// Critical - must be addressed in production
    Critical,
}

impl fmt::Display for WarningSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A security warning with severity and description
#[derive(Debug, Clone)]
pub struct SecurityWarning {
    pub severity: WarningSeverity,
    /// Short code identifying the warning type
    pub code: &'static str,
    pub message: String,
    /// Recommended action to resolve the issue
    pub recommendation: String,
}

impl SecurityWarning {
    #[must_use]
    pub fn new(
        severity: WarningSeverity,
        code: &'static str,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            recommendation: recommendation.into(),
        }
    }

    #[must_use]
    pub fn critical(
        code: &'static str,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self::new(WarningSeverity::Critical, code, message, recommendation)
    }

    #[must_use]
    pub fn warning(
        code: &'static str,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self::new(WarningSeverity::Warning, code, message, recommendation)
    }

    #[must_use]
    pub fn info(
        code: &'static str,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self::new(WarningSeverity::Info, code, message, recommendation)
    }

    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(self.severity, WarningSeverity::Critical)
    }
}

impl fmt::Display for SecurityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} - {}",
            self.severity, self.code, self.message, self.recommendation
        )
    }
}

/// Validates application configuration for security issues
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityValidator;

impl SecurityValidator {
    /// Validate configuration and return all security warnings
    ///
    /// Returns a list of warnings sorted by severity (critical first).
    #[must_use]
    pub fn validate(config: &AppConfig) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();
        let is_production = config.is_production();

        Self::check_jwt_secret(config, is_production, &mut warnings);
        Self::check_token_lifetime(config, &mut warnings);
        Self::check_cors_configuration(config, is_production, &mut warnings);
        Self::check_database_configuration(config, is_production, &mut warnings);

        warnings.sort_by(|a, b| b.severity.cmp(&a.severity));
        warnings
    }

    /// Whether the server should refuse to start
    #[must_use]
    pub fn should_block_startup(config: &AppConfig, warnings: &[SecurityWarning]) -> bool {
        let has_critical = warnings.iter().any(SecurityWarning::is_critical);
        let allow_insecure = std::env::var(ALLOW_INSECURE_ENV)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        config.is_production() && has_critical && !allow_insecure
    }

    /// Log all warnings using tracing
    pub fn log_warnings(warnings: &[SecurityWarning]) {
        for warning in warnings {
            match warning.severity {
                WarningSeverity::Critical => {
                    tracing::error!(
                        code = %warning.code,
                        message = %warning.message,
                        recommendation = %warning.recommendation,
                        "Security configuration issue"
                    );
                },
                WarningSeverity::Warning => {
                    tracing::warn!(
                        code = %warning.code,
                        message = %warning.message,
                        recommendation = %warning.recommendation,
                        "Security configuration warning"
                    );
                },
                WarningSeverity::Info => {
                    tracing::info!(
                        code = %warning.code,
                        message = %warning.message,
                        recommendation = %warning.recommendation,
                        "Security configuration notice"
                    );
                },
            }
        }
    }

    fn check_jwt_secret(config: &AppConfig, is_production: bool, warnings: &mut Vec<SecurityWarning>) {
        if config.auth.uses_default_secret() {
            let severity = if is_production {
                WarningSeverity::Critical
            } else {
                WarningSeverity::Warning
            };
            warnings.push(SecurityWarning::new(
                severity,
                "SEC001",
                "The demo JWT signing secret is in use",
                "Set RLS__AUTH__JWT_SECRET to a random value of at least 32 bytes",
            ));
        } else if config.auth.jwt_secret.expose_secret().len() < MIN_SECRET_BYTES {
            warnings.push(SecurityWarning::warning(
                "SEC002",
                format!("JWT signing secret is shorter than {MIN_SECRET_BYTES} bytes"),
                "Use a longer random secret for HMAC-SHA256",
            ));
        }
    }

    fn check_token_lifetime(config: &AppConfig, warnings: &mut Vec<SecurityWarning>) {
        let minutes = config.auth.expiration_minutes;
        if minutes <= 0 {
            warnings.push(SecurityWarning::critical(
                "SEC003",
                format!("Token lifetime of {minutes} minutes issues already-expired tokens"),
                "Set auth.expiration_minutes to a positive value",
            ));
        } else if minutes > MAX_EXPIRATION_MINUTES {
            warnings.push(SecurityWarning::warning(
                "SEC003",
                format!("Tokens stay valid for {minutes} minutes"),
                "Keep auth.expiration_minutes at one day or less",
            ));
        }
    }

    fn check_cors_configuration(
        config: &AppConfig,
        is_production: bool,
        warnings: &mut Vec<SecurityWarning>,
    ) {
        if config.server.allowed_origins.is_empty() {
            let severity = if is_production {
                WarningSeverity::Critical
            } else {
                WarningSeverity::Info
            };

            warnings.push(SecurityWarning::new(
                severity,
                "SEC004",
                "CORS allows all origins",
                "Specify server.allowed_origins in production to restrict cross-origin requests",
            ));
        }
    }

    fn check_database_configuration(
        config: &AppConfig,
        is_production: bool,
        warnings: &mut Vec<SecurityWarning>,
    ) {
        if is_production && config.database.path == ":memory:" {
            warnings.push(SecurityWarning::warning(
                "SEC005",
                "Production uses an in-memory database; all data is lost on restart",
                "Point database.path to a file",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::Environment;

    fn production_config() -> AppConfig {
        AppConfig {
            environment: Environment::Production,
            ..Default::default()
        }
    }

    fn hardened(mut config: AppConfig) -> AppConfig {
        config.auth.jwt_secret = SecretString::from("0123456789abcdef0123456789abcdef-prod");
        config.server.allowed_origins = vec!["https://rls.example".to_string()];
        config
    }

    #[test]
    fn hardened_production_config_has_no_critical_warnings() {
        let config = hardened(production_config());
        let warnings = SecurityValidator::validate(&config);
        assert!(warnings.iter().all(|w| !w.is_critical()));
        assert!(!SecurityValidator::should_block_startup(&config, &warnings));
    }

    #[test]
    fn default_secret_warns_in_development() {
        let warnings = SecurityValidator::validate(&AppConfig::default());
        let warning = warnings.iter().find(|w| w.code == "SEC001").unwrap();
        assert_eq!(warning.severity, WarningSeverity::Warning);
    }

    #[test]
    fn default_secret_blocks_production() {
        let mut config = hardened(production_config());
        config.auth.jwt_secret = SecretString::from(crate::config::DEFAULT_JWT_SECRET);

        let warnings = SecurityValidator::validate(&config);
        assert!(warnings.iter().find(|w| w.code == "SEC001").unwrap().is_critical());
        assert!(SecurityValidator::should_block_startup(&config, &warnings));
    }

    #[test]
    fn short_secret_warns() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SecretString::from("short");
        let warnings = SecurityValidator::validate(&config);
        assert!(warnings.iter().any(|w| w.code == "SEC002"));
        assert!(!warnings.iter().any(|w| w.code == "SEC001"));
    }

    #[test]
    fn token_lifetime_bounds() {
        let mut config = AppConfig::default();
        config.auth.expiration_minutes = 0;
        let warnings = SecurityValidator::validate(&config);
        assert!(warnings.iter().find(|w| w.code == "SEC003").unwrap().is_critical());

        config.auth.expiration_minutes = 7 * 24 * 60;
        let warnings = SecurityValidator::validate(&config);
        assert_eq!(
            warnings.iter().find(|w| w.code == "SEC003").unwrap().severity,
            WarningSeverity::Warning
        );
    }

    #[test]
    fn open_cors_is_critical_only_in_production() {
        let dev = SecurityValidator::validate(&AppConfig::default());
        assert_eq!(
            dev.iter().find(|w| w.code == "SEC004").unwrap().severity,
            WarningSeverity::Info
        );

        let prod = SecurityValidator::validate(&production_config());
        assert!(prod.iter().find(|w| w.code == "SEC004").unwrap().is_critical());
    }

    #[test]
    fn in_memory_database_warns_in_production() {
        let mut config = hardened(production_config());
        config.database.path = ":memory:".to_string();
        let warnings = SecurityValidator::validate(&config);
        assert!(warnings.iter().any(|w| w.code == "SEC005"));
    }

    #[test]
    fn development_never_blocks() {
        let config = AppConfig::default();
        let warnings = vec![SecurityWarning::critical("TEST", "Test critical", "Fix it")];
        assert!(!SecurityValidator::should_block_startup(&config, &warnings));
    }

    #[test]
    fn warnings_sorted_by_severity() {
        let warnings = SecurityValidator::validate(&production_config());
        assert!(warnings.windows(2).all(|w| w[0].severity >= w[1].severity));
    }

    #[test]
    fn warning_display_format() {
        let warning = SecurityWarning::critical("SEC001", "Test message", "Test recommendation");
        assert_eq!(
            warning.to_string(),
            "[CRITICAL] SEC001: Test message - Test recommendation"
        );
    }
}
