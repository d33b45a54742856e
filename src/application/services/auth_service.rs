//! Access Token Validation
//!
//! Verifies access tokens embedded in live commands. Tokens are issued
//! elsewhere and signed with RS256; this service only checks them.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Token validator trait for dependency injection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a token and return its claims
    async fn validate(&self, token: &str) -> Result<Claims, AuthError>;
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid public key: {0}")]
    InvalidKey(String),
}

/// RS256 validator backed by a configured public key
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    /// Build from a base64-encoded PEM public key.
    pub fn from_base64_pem(encoded: &str) -> Result<Self, AuthError> {
        let pem = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuthError::InvalidKey(format!("not base64: {}", e)))?;

        let key = DecodingKey::from_rsa_pem(&pem)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        Ok(Self {
            key,
            validation: Validation::new(Algorithm::RS256),
        })
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("missing subject".into()));
        }

        Ok(data.claims)
    }
}
