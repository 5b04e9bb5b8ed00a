//! Signed tokens used by authgate.
//!
//! This crate provides:
//! - `StateTokens`: short-lived anti-forgery tokens for the OAuth redirect
//!   round-trip, carrying only an expiry
//! - `TokenService`: the access/refresh credential pair bound to a session
//!
//! Both are stateless HS256 JWTs signed with the same configured secret and
//! verified with exactly that algorithm. Revocation is not a concern of this
//! crate: a credential is honored only while its session is live, which the
//! caller checks against the session store.

pub mod error;
pub mod state;
pub mod token;

pub use error::CredentialError;
pub use state::{DEFAULT_STATE_TTL_MINUTES, StateTokens};
pub use token::{
    Claims, DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS, TokenKind, TokenPair, TokenService,
};

use jsonwebtoken::{Algorithm, Validation};

/// The only signing algorithm issued or accepted.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Builds the validation rules shared by every token type.
///
/// Expiry is checked without leeway and the header algorithm must be exactly
/// [`SIGNING_ALGORITHM`].
pub(crate) fn strict_validation() -> Validation {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.leeway = 0;
    validation.validate_aud = false;
    validation
}

/// Maps a jsonwebtoken failure onto the crate's error type.
pub(crate) fn classify(error: &jsonwebtoken::errors::Error) -> CredentialError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::ExpiredSignature => CredentialError::Expired,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            CredentialError::AlgorithmMismatch
        }
        ErrorKind::InvalidSignature => CredentialError::InvalidSignature,
        _ => CredentialError::Malformed {
            reason: error.to_string(),
        },
    }
}
