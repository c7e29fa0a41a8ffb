use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Error codes surfaced to callers.
///
/// 1000-series codes are general failures, 2000-series codes are
/// authentication outcomes. Every error response carries exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InternalError,
    InvalidRequest,
    ServiceUnavailable,
    AuthenticationFailed,
    EmailNotConfirmed,
    UserNotFound,
    PasswordTooShort,
    PasswordIncorrect,
    TokenExpired,
    CodeMismatch,
    Unauthorized,
    UserAlreadyExists,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InternalError => "1000",
            ErrorCode::InvalidRequest => "1001",
            ErrorCode::ServiceUnavailable => "1002",
            ErrorCode::AuthenticationFailed => "2000",
            ErrorCode::EmailNotConfirmed => "2001",
            ErrorCode::UserNotFound => "2002",
            ErrorCode::PasswordTooShort => "2003",
            ErrorCode::PasswordIncorrect => "2004",
            ErrorCode::TokenExpired => "2005",
            ErrorCode::CodeMismatch => "2006",
            ErrorCode::Unauthorized => "2007",
            ErrorCode::UserAlreadyExists => "2008",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InternalError => "An unexpected error occurred. Please try again later.",
            ErrorCode::InvalidRequest => "The request was invalid. Please check your input.",
            ErrorCode::ServiceUnavailable => {
                "Service is temporarily unavailable. Please try again later."
            }
            ErrorCode::AuthenticationFailed => {
                "Authentication failed. Please check your credentials."
            }
            ErrorCode::EmailNotConfirmed => "Your email address has not been confirmed.",
            ErrorCode::UserNotFound => "The specified user does not exist.",
            ErrorCode::PasswordTooShort => "The password provided is too short.",
            ErrorCode::PasswordIncorrect => "The password provided is incorrect.",
            ErrorCode::TokenExpired => "The session has expired. Please log in again.",
            ErrorCode::CodeMismatch => "The confirmation code does not match.",
            ErrorCode::Unauthorized => "You are not authorized to perform this action.",
            ErrorCode::UserAlreadyExists => "A user with this information already exists.",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InvalidRequest
            | ErrorCode::PasswordTooShort
            | ErrorCode::CodeMismatch => StatusCode::BAD_REQUEST,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::AuthenticationFailed
            | ErrorCode::PasswordIncorrect
            | ErrorCode::TokenExpired
            | ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::EmailNotConfirmed => StatusCode::FORBIDDEN,
            ErrorCode::UserNotFound => StatusCode::NOT_FOUND,
            ErrorCode::UserAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Token expired")]
    TokenExpired,

    #[error("Upstream rejected request with {code:?} ({provider_code})")]
    UpstreamRejected {
        code: ErrorCode,
        provider_code: String,
    },

    #[error("Upstream unavailable [{support_code}]: {detail}")]
    UpstreamUnavailable {
        support_code: &'static str,
        detail: String,
    },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// The caller-facing code this error renders as.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => ErrorCode::InvalidRequest,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::TokenExpired => ErrorCode::TokenExpired,
            AppError::UpstreamRejected { code, .. } => *code,
            AppError::UpstreamUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::InternalError(_) | AppError::ConfigError(_) => ErrorCode::InternalError,
        }
    }

    pub fn support_code(&self) -> Option<&'static str> {
        match self {
            AppError::UpstreamUnavailable { support_code, .. } => Some(*support_code),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let support_code = self.support_code();

        let details = match &self {
            AppError::ValidationError(err) => Some(err.to_string()),
            AppError::BadRequest(err) => Some(err.to_string()),
            AppError::Unauthorized(err) => {
                tracing::debug!(reason = %err, "Rejected unauthenticated request");
                None
            }
            AppError::UpstreamRejected { provider_code, .. } => {
                tracing::info!(
                    code = code.code(),
                    provider_code = %provider_code,
                    "Identity provider rejected request"
                );
                None
            }
            AppError::UpstreamUnavailable {
                support_code,
                detail,
            } => {
                tracing::warn!(
                    support_code = %support_code,
                    detail = %detail,
                    "Identity provider unavailable"
                );
                None
            }
            AppError::InternalError(err) | AppError::ConfigError(err) => {
                tracing::error!(error = ?err, "Internal server error");
                None
            }
            AppError::TokenExpired => None,
        };

        (
            code.status(),
            Json(ErrorBody {
                code: code.code(),
                message: code.message().to_string(),
                support_code,
                details,
            }),
        )
            .into_response()
    }
}
