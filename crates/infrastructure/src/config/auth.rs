//! Bearer token configuration.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Signing secret shipped with the demo; never use it outside development
pub const DEFAULT_JWT_SECRET: &str = "TheB€stKept_secretIn-the*World";

/// JWT signing and claim configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC-SHA256 signing secret (sensitive - uses SecretString)
    #[serde(default = "default_jwt_secret", skip_serializing)]
    pub jwt_secret: SecretString,

    /// Token lifetime in minutes
    #[serde(default = "default_expiration_minutes")]
    pub expiration_minutes: i64,

    /// `iss` claim written and required on tokens
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Claim carrying the tenant id
    #[serde(default = "default_tenant_claim")]
    pub tenant_claim: String,
}

fn default_jwt_secret() -> SecretString {
    SecretString::from(DEFAULT_JWT_SECRET)
}

const fn default_expiration_minutes() -> i64 {
    60
}

fn default_issuer() -> String {
    "rls-demo".to_string()
}

fn default_tenant_claim() -> String {
    "TenantId".to_string()
}

impl AuthConfig {
    /// Whether the demo secret is still configured
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret.expose_secret() == DEFAULT_JWT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            expiration_minutes: default_expiration_minutes(),
            issuer: default_issuer(),
            tenant_claim: default_tenant_claim(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("expiration_minutes", &self.expiration_minutes)
            .field("issuer", &self.issuer)
            .field("tenant_claim", &self.tenant_claim)
            .finish()
    }
}
