//! Bearer token resolution.
//!
//! An [`AuthClient`] only turns a token into a user name. Looking the name up and deciding
//! what the caller may do happens in the [`Caller`](crate::extractors::auth::Caller) extractor.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("unknown token")]
    Unknown,
    #[error("token has no subject")]
    NoSubject,
}

pub trait AuthClient: Send + Sync {
    /// Resolve a bearer token to the name of the user it was issued for.
    fn resolve(&self, token: &str) -> Result<String, AuthError>;
}

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub exp: usize,  // Expiration timestamp
}

/// HS256 tokens signed with a shared secret.
pub struct JwtAuthClient {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtAuthClient {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `name`, valid for seven days.
    pub fn sign(&self, name: &str) -> Result<String, AuthError> {
        self.sign_with_ttl(name, Duration::days(7))
    }

    fn sign_with_ttl(&self, name: &str, ttl: Duration) -> Result<String, AuthError> {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: name.to_owned(),
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }
}

impl AuthClient for JwtAuthClient {
    fn resolve(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::NoSubject);
        }
        Ok(data.claims.sub)
    }
}

/// Fixed token table, for tests and local development.
#[derive(Default)]
pub struct StaticAuthClient {
    tokens: RwLock<HashMap<String, String>>,
}

impl StaticAuthClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, name: impl Into<String>) {
        let mut tokens = match self.tokens.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tokens.insert(token.into(), name.into());
    }
}

impl AuthClient for StaticAuthClient {
    fn resolve(&self, token: &str) -> Result<String, AuthError> {
        let tokens = match self.tokens.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tokens.get(token).cloned().ok_or(AuthError::Unknown)
    }
}
