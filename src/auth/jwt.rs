use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distinguishes the two token classes carried in the `typ` claim.
///
/// Access tokens are verified statelessly; refresh tokens are additionally
/// looked up by hash in the store before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Unique token id. Keeps tokens minted within the same second from
    /// colliding, since refresh tokens are stored by content hash.
    pub jti: String,
    /// Organization scope, absent for tokens minted before org resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<i32>,
    /// Token class
    pub typ: TokenKind,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("wrong token type")]
    WrongKind,
}

/// Create a signed token for a user, scoped to an organization when known.
pub fn create_token(
    user_id: i32,
    organization_id: Option<i32>,
    kind: TokenKind,
    secret: &str,
    ttl_seconds: u64,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let expires = now + Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX));

    let claims = Claims {
        sub: user_id.to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        org: organization_id,
        typ: kind,
        exp: expires.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| JwtError::Invalid)
}

/// Validate signature and expiry, then check the token class.
pub fn verify_token(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, JwtError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid,
    })?;

    if data.claims.typ != expected {
        return Err(JwtError::WrongKind);
    }

    Ok(data.claims)
}

impl Claims {
    /// Parse the subject back into a user id.
    pub fn user_id(&self) -> Result<i32, JwtError> {
        self.sub.parse().map_err(|_| JwtError::Invalid)
    }
}
