//! # JWT bearer verification
//!
//! HS256 tokens whose `sub` is the user's UUID. The audience is checked
//! only when one is configured. Admins are a static allow-list.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use domains::{AuthProvider, Result, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

pub struct JwtAuthProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    audience: Option<String>,
    admin_ids: HashSet<UserId>,
}

impl JwtAuthProvider {
    pub fn new(secret: &[u8], audience: Option<String>, admin_ids: HashSet<UserId>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match &audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            audience,
            admin_ids,
        }
    }

    /// Checks signature, expiry and audience, then parses the subject.
    pub fn verify(&self, token: &str) -> std::result::Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidSubject(data.claims.sub))
    }

    /// Signs a token with the same secret. Used by the seed tool and tests;
    /// production tokens come from the identity provider.
    pub fn issue_token(&self, user_id: UserId, ttl: Duration) -> std::result::Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            aud: self.audience.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

impl AuthProvider for JwtAuthProvider {
    fn resolve_viewer(&self, bearer_token: &str) -> Result<UserId> {
        self.verify(bearer_token).map_err(|e| {
            debug!(error = %e, "rejected bearer token");
            e.into()
        })
    }

    fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }
}
