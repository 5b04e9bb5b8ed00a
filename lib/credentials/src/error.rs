//! Error types for token operations.

use crate::token::TokenKind;
use std::fmt;

/// Errors from issuing or verifying tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Signing a token failed.
    Signing { reason: String },
    /// The token's expiry has elapsed.
    Expired,
    /// The token header names an algorithm other than the configured one.
    AlgorithmMismatch,
    /// The signature does not match the configured secret.
    InvalidSignature,
    /// The token could not be decoded.
    Malformed { reason: String },
    /// A valid token of the wrong kind was presented.
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signing { reason } => write!(f, "failed to sign token: {reason}"),
            Self::Expired => write!(f, "token has expired"),
            Self::AlgorithmMismatch => write!(f, "unexpected signing algorithm"),
            Self::InvalidSignature => write!(f, "invalid token signature"),
            Self::Malformed { reason } => write!(f, "malformed token: {reason}"),
            Self::WrongKind { expected, actual } => {
                write!(f, "expected {expected} token, got {actual} token")
            }
        }
    }
}

impl std::error::Error for CredentialError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_kind_display_names_both_kinds() {
        let err = CredentialError::WrongKind {
            expected: TokenKind::Access,
            actual: TokenKind::Refresh,
        };
        assert_eq!(err.to_string(), "expected access token, got refresh token");
    }

    #[test]
    fn malformed_display_includes_reason() {
        let err = CredentialError::Malformed {
            reason: "bad base64".to_string(),
        };
        assert!(err.to_string().contains("bad base64"));
    }
}
