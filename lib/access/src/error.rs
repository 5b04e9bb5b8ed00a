//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError`: Failures from the relational store
//! - `GeoError`: Failures from IP geolocation (never fatal)
//! - `AuthenticationError`: Failures of the sign-in, refresh and
//!   authorization flows, each mapping onto one public `ErrorKind`

use crate::provider::Provider;
use std::fmt;

/// The public error taxonomy.
///
/// The request boundary answers with exactly one of these kinds and a static
/// message; internal detail stays in the server log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing request fields, or an invalid state token.
    InvalidInput,
    /// Bad, expired or mismatched token, or a revoked/missing session or user.
    Unauthorized,
    /// Provider exchange or profile failure, or an unsupported provider.
    OAuth,
    /// Store or other collaborator failure.
    Internal,
}

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The query could not be executed.
    Query { reason: String },
    /// A stored row could not be converted into a domain value.
    Decode { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { reason } => write!(f, "store query failed: {reason}"),
            Self::Decode { reason } => write!(f, "failed to decode stored row: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from IP geolocation lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    /// The lookup failed or returned nothing usable.
    Lookup { ip: String, reason: String },
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lookup { ip, reason } => write!(f, "geolocation lookup for {ip} failed: {reason}"),
        }
    }
}

impl std::error::Error for GeoError {}

/// Errors from authentication and authorization flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// A required request field is missing or malformed.
    InvalidRequest { reason: String },
    /// The OAuth state token failed validation.
    InvalidState,
    /// The Authorization header is missing or not a bearer credential.
    MissingCredentials,
    /// A credential token failed verification.
    InvalidToken,
    /// Session not found or soft-deleted.
    SessionNotFound { session_id: String },
    /// User not found or soft-deleted.
    UserNotFound { user_id: String },
    /// The provider name is empty or not one of the supported variants.
    UnsupportedProvider { name: String },
    /// The provider is supported but has no client credentials configured.
    ProviderNotConfigured { provider: Provider },
    /// The provider's token exchange or profile endpoint failed.
    ProviderError { provider: Provider, reason: String },
    /// The provider profile carries no usable email address.
    MissingEmail { provider: Provider },
    /// The store failed while serving the request.
    Storage,
    /// A state or credential token could not be signed.
    TokenIssue,
}

impl AuthenticationError {
    /// Returns the public error kind for this failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } | Self::InvalidState => ErrorKind::InvalidInput,
            Self::MissingCredentials
            | Self::InvalidToken
            | Self::SessionNotFound { .. }
            | Self::UserNotFound { .. } => ErrorKind::Unauthorized,
            Self::UnsupportedProvider { .. }
            | Self::ProviderNotConfigured { .. }
            | Self::ProviderError { .. }
            | Self::MissingEmail { .. } => ErrorKind::OAuth,
            Self::Storage | Self::TokenIssue => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
            Self::InvalidState => write!(f, "invalid oauth state"),
            Self::MissingCredentials => write!(f, "missing bearer credentials"),
            Self::InvalidToken => write!(f, "invalid token"),
            Self::SessionNotFound { session_id } => write!(f, "session not found: {session_id}"),
            Self::UserNotFound { user_id } => write!(f, "user not found: {user_id}"),
            Self::UnsupportedProvider { name } => {
                if name.is_empty() {
                    write!(f, "provider is required")
                } else {
                    write!(f, "unsupported oauth provider: {name}")
                }
            }
            Self::ProviderNotConfigured { provider } => {
                write!(f, "oauth provider '{provider}' is not configured")
            }
            Self::ProviderError { provider, reason } => {
                write!(f, "oauth provider '{provider}' error: {reason}")
            }
            Self::MissingEmail { provider } => {
                write!(f, "oauth provider '{provider}' returned no email")
            }
            Self::Storage => write!(f, "storage failure"),
            Self::TokenIssue => write!(f, "failed to issue token"),
        }
    }
}

impl std::error::Error for AuthenticationError {}
