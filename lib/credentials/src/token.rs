//! Access/refresh credential pairs bound to a session.
//!
//! Both tokens of a pair carry the same user, session and email claims and
//! differ in lifetime and in the `typ` claim. The `typ` claim is checked on
//! every verification so a refresh token cannot stand in for an access token
//! and vice versa.

use authgate_core::{Secret, SessionId, UserId};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, decode, encode};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CredentialError;
use crate::{SIGNING_ALGORITHM, classify, strict_validation};

/// Default access token lifetime, in minutes.
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 60;

/// Default refresh token lifetime, in days.
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// Which half of a credential pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Returns the claim value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verified payload of a credential token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user the credential was issued to.
    pub user_id: UserId,
    /// The session whose liveness gates the credential.
    pub session_id: SessionId,
    /// The user's email at issue time.
    pub email: String,
    /// Access or refresh.
    pub typ: TokenKind,
    /// Expiry as a unix timestamp in seconds.
    pub exp: i64,
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies credential tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Creates a service signing with `secret`.
    #[must_use]
    pub fn new(secret: &Secret, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issues an access/refresh pair for the given session.
    pub fn issue_pair(
        &self,
        user_id: UserId,
        session_id: SessionId,
        email: &str,
    ) -> Result<TokenPair, Report<CredentialError>> {
        let access_token = self.sign(user_id, session_id, email, TokenKind::Access)?;
        let refresh_token = self.sign(user_id, session_id, email, TokenKind::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verifies signature, algorithm, expiry and kind, returning the claims.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, Report<CredentialError>> {
        let data = decode::<Claims>(token, &self.decoding_key, &strict_validation())
            .map_err(|e| classify(&e))?;

        if data.claims.typ != expected {
            return Err(CredentialError::WrongKind {
                expected,
                actual: data.claims.typ,
            }
            .into());
        }

        Ok(data.claims)
    }

    fn sign(
        &self,
        user_id: UserId,
        session_id: SessionId,
        email: &str,
        typ: TokenKind,
    ) -> Result<String, Report<CredentialError>> {
        let ttl = match typ {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            user_id,
            session_id,
            email: email.to_string(),
            typ,
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            CredentialError::Signing {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn service() -> TokenService {
        TokenService::new(
            &Secret::new("credential-secret"),
            Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            Duration::days(DEFAULT_REFRESH_TTL_DAYS),
        )
    }

    #[test]
    fn pair_carries_identical_identity_claims() {
        let tokens = service();
        let user_id = UserId::new();
        let session_id = SessionId::new();

        let pair = tokens
            .issue_pair(user_id, session_id, "bob@x.com")
            .expect("issue");

        let access = tokens.verify(&pair.access_token, TokenKind::Access).expect("access");
        let refresh = tokens
            .verify(&pair.refresh_token, TokenKind::Refresh)
            .expect("refresh");

        assert_eq!(access.user_id, user_id);
        assert_eq!(access.session_id, session_id);
        assert_eq!(access.email, "bob@x.com");
        assert_eq!(refresh.user_id, access.user_id);
        assert_eq!(refresh.session_id, access.session_id);
        assert_eq!(refresh.email, access.email);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let tokens = service();
        let pair = tokens
            .issue_pair(UserId::new(), SessionId::new(), "a@b.c")
            .expect("issue");

        let err = tokens
            .verify(&pair.refresh_token, TokenKind::Access)
            .unwrap_err();
        assert_eq!(
            err.current_context(),
            &CredentialError::WrongKind {
                expected: TokenKind::Access,
                actual: TokenKind::Refresh,
            }
        );

        assert!(tokens.verify(&pair.access_token, TokenKind::Refresh).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(
            &Secret::new("credential-secret"),
            Duration::seconds(-5),
            Duration::seconds(-5),
        );
        let pair = tokens
            .issue_pair(UserId::new(), SessionId::new(), "a@b.c")
            .expect("issue");

        let err = tokens.verify(&pair.access_token, TokenKind::Access).unwrap_err();
        assert_eq!(err.current_context(), &CredentialError::Expired);
    }

    #[test]
    fn other_secret_is_rejected() {
        let pair = service()
            .issue_pair(UserId::new(), SessionId::new(), "a@b.c")
            .expect("issue");
        let other = TokenService::new(
            &Secret::new("another-secret"),
            Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            Duration::days(DEFAULT_REFRESH_TTL_DAYS),
        );

        let err = other.verify(&pair.access_token, TokenKind::Access).unwrap_err();
        assert_eq!(err.current_context(), &CredentialError::InvalidSignature);
    }

    #[test]
    fn mismatched_algorithm_is_rejected_even_with_valid_payload() {
        let secret = Secret::new("credential-secret");
        let claims = Claims {
            user_id: UserId::new(),
            session_id: SessionId::new(),
            email: "a@b.c".to_string(),
            typ: TokenKind::Access,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let forged = encode(
            &Header::new(jsonwebtoken::Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode");

        let err = service().verify(&forged, TokenKind::Access).unwrap_err();
        assert_eq!(err.current_context(), &CredentialError::AlgorithmMismatch);
    }

    #[test]
    fn unsigned_none_token_is_rejected() {
        let claims = Claims {
            user_id: UserId::new(),
            session_id: SessionId::new(),
            email: "a@b.c".to_string(),
            typ: TokenKind::Access,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("serialize claims"));
        let forged = format!("{header}.{payload}.");

        assert!(service().verify(&forged, TokenKind::Access).is_err());
    }
}
