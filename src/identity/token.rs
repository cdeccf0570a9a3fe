//! Signed, stateless session credentials (HS256 JWT).
//!
//! The codec is a pure function of (secret, clock, input). Verification
//! collapses every failure (malformed, foreign secret, expired) into `None`
//! so callers cannot tell them apart.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::principal::{Identity, Role};
use crate::error::{AppError, AppResult};

/// Credential lifetime in seconds (7 days). Also the cookie max-age.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

pub type SessionToken = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Claims {
    sub: String,
    email: String,
    role: Role,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    iat: i64,
    exp: i64,
}

impl Claims {
    fn into_identity(self) -> Identity {
        Identity { id: self.sub, email: self.email, role: self.role, first_name: self.first_name, last_name: self.last_name }
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("ttl_secs", &self.ttl.num_seconds()).finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from the server-held signing secret. An empty secret is a
    /// configuration error and must stop the process at startup.
    pub fn new(secret: &str) -> AppResult<Self> {
        if secret.trim().is_empty() {
            return Err(AppError::config("missing_signing_secret", "signing secret is not configured"));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `verify_at`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(TOKEN_TTL_SECS),
        })
    }

    pub fn issue(&self, identity: &Identity) -> AppResult<SessionToken> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the clock read `now`.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> AppResult<SessionToken> {
        let claims = Claims {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal("token_encode_failed".to_string(), e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Option<Identity> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature and expiry as if the clock read `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<Identity> {
        let data = decode::<Claims>(token.trim(), &self.decoding, &self.validation).ok()?;
        if data.claims.exp <= now.timestamp() {
            return None;
        }
        Some(data.claims.into_identity())
    }
}
