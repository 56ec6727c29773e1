//! JWT access-token issuance and validation.
//!
//! Access tokens are short-lived HS256 JWTs. Validation is total: a token
//! either yields a full set of claims or it yields nothing, and the caller
//! never learns which check failed.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::models::{Role, User};
use crate::config::AuthConfig;
use crate::domain::{OrganizationId, UserId};
use crate::errors::{Result, TaskplaneError};

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user id)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Role string, parsed into [`Role`] at the boundary
    pub role: String,
    /// Organization id, absent for unaffiliated users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Typed identity extracted from validated claims. Built once per request so
/// downstream code never touches raw claim strings.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub role: Role,
}

impl AccessTokenClaims {
    /// Convert validated claims into a typed [`Actor`].
    ///
    /// An unparseable role or subject means the token was minted by a
    /// different version of the service; treat it as any other invalid token.
    pub fn to_actor(&self) -> Option<Actor> {
        let role = self.role.parse::<Role>().ok()?;
        Some(Actor {
            user_id: UserId::from_string(self.sub.clone()),
            organization_id: self.org.clone().map(OrganizationId::from_string),
            role,
        })
    }
}

/// Issues and validates access tokens for a single signing key.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl_minutes: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&[&config.jwt_audience]);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            ttl_minutes: config.access_token_ttl_minutes as i64,
        }
    }

    /// Mint a signed access token for the given user.
    pub fn create_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();

        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            role: user.role.to_string(),
            org: user.organization_id.as_ref().map(|id| id.to_string()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::minutes(self.ttl_minutes)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| TaskplaneError::internal(format!("Failed to sign access token: {}", err)))
    }

    /// Validate a token's signature, expiry, issuer, and audience.
    ///
    /// Returns `None` for any failure; the reason is deliberately not exposed.
    pub fn validate_token(&self, token: &str) -> Option<AccessTokenClaims> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .ok()
    }
}
