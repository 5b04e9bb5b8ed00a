//! Response envelopes and the public error mapping.
//!
//! Every response body is wrapped in `{success, data}` or
//! `{success:false, error:{code, message, details}}`. Error bodies only
//! ever carry the static message and details of their kind; the full
//! report is logged instead.

use authgate_access::{AuthenticationError, ErrorKind};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;

/// A successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A public error, rendered as the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    InvalidInput,
    Unauthorized,
    OAuth,
    Internal,
    NotFound,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::OAuth => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// The stable machine-readable message.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::OAuth => "OAUTH_ERROR",
            Self::Internal => "INTERNAL_SERVER_ERROR",
            Self::NotFound => "NOT_FOUND",
        }
    }

    #[must_use]
    pub fn details(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The input is invalid.",
            Self::Unauthorized => "You are not authorized to access this resource.",
            Self::OAuth => "OAuth error.",
            Self::Internal => "Internal server error.",
            Self::NotFound => "The requested resource was not found.",
        }
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidInput => Self::InvalidInput,
            ErrorKind::Unauthorized => Self::Unauthorized,
            ErrorKind::OAuth => Self::OAuth,
            ErrorKind::Internal => Self::Internal,
        }
    }
}

impl From<Report<AuthenticationError>> for ApiError {
    fn from(report: Report<AuthenticationError>) -> Self {
        let kind = report.current_context().kind();
        match kind {
            ErrorKind::Internal => tracing::error!(error = ?report, "request failed"),
            ErrorKind::OAuth => tracing::warn!(error = %report, "oauth flow failed"),
            ErrorKind::InvalidInput | ErrorKind::Unauthorized => {
                tracing::debug!(error = %report, "request rejected");
            }
        }
        kind.into()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: &'static str,
    details: &'static str,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: status.as_u16(),
                message: self.message(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// The database could not be reached or migrated.
    Database { reason: String },
    /// The cache client could not be created.
    Cache { reason: String },
    /// An identity provider's settings are invalid.
    Provider { reason: String },
    /// An outbound HTTP client could not be built.
    HttpClient { reason: String },
    /// The listener could not bind or the server loop failed.
    Serve { reason: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "configuration error: {reason}"),
            Self::Database { reason } => write!(f, "database error: {reason}"),
            Self::Cache { reason } => write!(f, "cache error: {reason}"),
            Self::Provider { reason } => write!(f, "identity provider setup failed: {reason}"),
            Self::HttpClient { reason } => write!(f, "failed to build http client: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_access::Provider;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(ApiError::InvalidInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::OAuth.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn report_maps_through_its_kind() {
        let report: Report<AuthenticationError> = AuthenticationError::ProviderError {
            provider: Provider::Google,
            reason: "token endpoint returned 500".to_string(),
        }
        .into();
        assert_eq!(ApiError::from(report), ApiError::OAuth);

        let report: Report<AuthenticationError> = AuthenticationError::Storage.into();
        assert_eq!(ApiError::from(report), ApiError::Internal);
    }

    #[test]
    fn envelope_never_carries_internal_detail() {
        let err = ApiError::Internal;
        assert_eq!(err.message(), "INTERNAL_SERVER_ERROR");
        assert_eq!(err.details(), "Internal server error.");
    }
}
