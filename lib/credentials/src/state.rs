//! Anti-forgery state tokens for the OAuth redirect round-trip.
//!
//! A state token is a signed claim carrying only an expiry. It is handed to
//! the identity provider as the `state` parameter and must come back intact
//! and unexpired on the callback. Nothing is persisted.

use authgate_core::Secret;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, decode, encode};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;
use crate::{SIGNING_ALGORITHM, classify, strict_validation};

/// Default lifetime of a state token, in minutes.
pub const DEFAULT_STATE_TTL_MINUTES: i64 = 15;

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    exp: i64,
}

/// Issues and validates state tokens.
#[derive(Clone)]
pub struct StateTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl StateTokens {
    /// Creates a codec signing with `secret`; tokens live for `ttl`.
    #[must_use]
    pub fn new(secret: &Secret, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a new state token expiring `ttl` from now.
    pub fn generate(&self) -> Result<String, Report<CredentialError>> {
        let claims = StateClaims {
            exp: (Utc::now() + self.ttl).timestamp(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            CredentialError::Signing {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Checks a state token, returning why it was rejected.
    pub fn check(&self, token: &str) -> Result<(), Report<CredentialError>> {
        decode::<StateClaims>(token, &self.decoding_key, &strict_validation())
            .map(|_| ())
            .map_err(|e| classify(&e).into())
    }

    /// Returns true if `token` carries a valid signature and has not expired.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        match self.check(token) {
            Ok(()) => true,
            Err(report) => {
                tracing::debug!(error = %report, "rejected oauth state token");
                false
            }
        }
    }
}
