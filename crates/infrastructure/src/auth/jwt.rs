//! HMAC-SHA256 JSON Web Tokens
//!
//! Tokens carry the caller's login (`sub` and `name`), roles, and the tenant
//! claim named by `auth.tenant_claim`. Verification accepts the tenant under
//! that name or, failing that, under `Tenant`, as a JSON number or a numeric
//! string.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use domain::TenantId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AuthConfig;

/// Claim consulted when the configured tenant claim is absent
const FALLBACK_TENANT_CLAIM: &str = "Tenant";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Signature, expiry, issuer or shape check failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token carries no tenant claim")]
    MissingTenant,

    #[error("Tenant claim is not an integer: {0}")]
    InvalidTenant(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Tenant and any other custom claims
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Acting identity: `name`, else `sub`
    pub fn identity(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(Some(self.sub.as_str()))
            .filter(|name| !name.is_empty())
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Tenant from `claim`, falling back to `Tenant`
    pub fn tenant_id(&self, claim: &str) -> Result<TenantId, AuthError> {
        let value = self
            .extra
            .get(claim)
            .or_else(|| self.extra.get(FALLBACK_TENANT_CLAIM))
            .ok_or(AuthError::MissingTenant)?;

        match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(TenantId::new)
                .ok_or_else(|| AuthError::InvalidTenant(n.to_string())),
            Value::String(s) if s.trim().is_empty() => Err(AuthError::MissingTenant),
            Value::String(s) => {
                TenantId::parse(s.trim()).map_err(|_| AuthError::InvalidTenant(s.clone()))
            },
            other => Err(AuthError::InvalidTenant(other.to_string())),
        }
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
    pub claims: Claims,
}

/// Signs and verifies tokens with the configured secret
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    lifetime: Duration,
    tenant_claim: String,
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .field("lifetime", &self.lifetime)
            .field("tenant_claim", &self.tenant_claim)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            lifetime: Duration::minutes(config.expiration_minutes),
            tenant_claim: config.tenant_claim.clone(),
        }
    }

    /// Name of the claim carrying the tenant id
    pub fn tenant_claim(&self) -> &str {
        &self.tenant_claim
    }

    /// Sign a token for `login` in `tenant_id`, valid from now for the configured lifetime
    pub fn issue(
        &self,
        login: &str,
        roles: Vec<String>,
        tenant_id: TenantId,
    ) -> Result<IssuedToken, AuthError> {
        self.issue_at(login, roles, tenant_id, Utc::now())
    }

    fn issue_at(
        &self,
        login: &str,
        roles: Vec<String>,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_on = now + self.lifetime;
        let mut extra = Map::new();
        extra.insert(self.tenant_claim.clone(), Value::from(tenant_id.value()));

        let claims = Claims {
            sub: login.to_string(),
            name: Some(login.to_string()),
            roles,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_on.timestamp(),
            extra,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_on,
            claims,
        })
    }

    /// Check signature, issuer and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}
