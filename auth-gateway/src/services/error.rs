use service_core::error::{AppError, ErrorCode};
use service_core::retry::{Cancelled, Retryable};
use thiserror::Error;

use crate::models::Operation;

/// Support codes identifying the provider fault class behind a 503.
pub mod support_codes {
    pub const THROTTLED: &str = "COG-REQ-0001";
    pub const LIMIT_EXCEEDED: &str = "COG-LIM-0002";
    pub const INVALID_PARAMETER: &str = "COG-PAR-0003";
    pub const PROVIDER_INTERNAL: &str = "COG-INT-0004";
    pub const TRANSPORT: &str = "COG-NET-0005";
    pub const TIMEOUT: &str = "COG-TMO-0006";
    pub const KEY_FETCH: &str = "COG-JWK-0007";
    pub const CANCELLED: &str = "COG-CAN-0008";
}

/// Outcome of a failed identity provider call.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The provider gave a definitive answer.
    #[error("{operation} rejected by provider: {provider_code}")]
    Rejected {
        operation: Operation,
        code: ErrorCode,
        provider_code: String,
    },

    #[error("Provider unavailable [{support_code}]: {detail}")]
    Unavailable {
        support_code: &'static str,
        detail: String,
        /// Transport errors, timeouts and 5xx; throttling is not.
        transient: bool,
    },

    #[error("Call cancelled")]
    Cancelled,

    #[error("Internal gateway error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Unavailable {
                support_code: support_codes::TIMEOUT,
                detail: "request to identity provider timed out".to_string(),
                transient: true,
            }
        } else {
            GatewayError::Unavailable {
                support_code: support_codes::TRANSPORT,
                detail: format!("transport failure: {}", err),
                transient: true,
            }
        }
    }

    /// Map a non-success provider response. The same exception means
    /// different things to different operations.
    pub fn from_provider(
        operation: Operation,
        status: reqwest::StatusCode,
        exception: Option<&str>,
    ) -> Self {
        let unavailable = |support_code: &'static str, transient: bool| GatewayError::Unavailable {
            support_code,
            detail: format!("{} ({})", exception.unwrap_or("no exception type"), status),
            transient,
        };
        let rejected = |code: ErrorCode| GatewayError::Rejected {
            operation,
            code,
            provider_code: exception.unwrap_or("unknown").to_string(),
        };

        match exception {
            Some("NotAuthorizedException") => match operation {
                Operation::ChangePassword => rejected(ErrorCode::PasswordIncorrect),
                Operation::UpdateUserAttributes => rejected(ErrorCode::Unauthorized),
                _ => rejected(ErrorCode::AuthenticationFailed),
            },
            Some("UserNotConfirmedException") => rejected(ErrorCode::EmailNotConfirmed),
            Some("UserNotFoundException") => rejected(ErrorCode::UserNotFound),
            Some("InvalidPasswordException") => rejected(ErrorCode::PasswordTooShort),
            Some("CodeMismatchException") | Some("ExpiredCodeException") => {
                rejected(ErrorCode::CodeMismatch)
            }
            Some("UsernameExistsException") | Some("AliasExistsException") => {
                rejected(ErrorCode::UserAlreadyExists)
            }
            Some("TooManyRequestsException") => unavailable(support_codes::THROTTLED, false),
            Some("LimitExceededException") => unavailable(support_codes::LIMIT_EXCEEDED, false),
            Some("InvalidParameterException") => {
                unavailable(support_codes::INVALID_PARAMETER, false)
            }
            Some("InternalErrorException") => unavailable(support_codes::PROVIDER_INTERNAL, true),
            _ if status.is_server_error() => unavailable(support_codes::PROVIDER_INTERNAL, true),
            _ => rejected(ErrorCode::InvalidRequest),
        }
    }
}

impl Retryable for GatewayError {
    fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable { transient: true, .. })
    }
}

impl From<Cancelled> for GatewayError {
    fn from(_: Cancelled) -> Self {
        GatewayError::Cancelled
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected {
                code,
                provider_code,
                ..
            } => AppError::UpstreamRejected {
                code,
                provider_code,
            },
            GatewayError::Unavailable {
                support_code,
                detail,
                ..
            } => AppError::UpstreamUnavailable {
                support_code,
                detail,
            },
            GatewayError::Cancelled => AppError::UpstreamUnavailable {
                support_code: support_codes::CANCELLED,
                detail: "request cancelled before the provider answered".to_string(),
            },
            GatewayError::Internal(e) => AppError::InternalError(e),
        }
    }
}

/// Failure of the credential validator itself, as opposed to an invalid
/// token.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Signing key fetch failed: {detail}")]
    KeyFetch { detail: String, transient: bool },

    #[error("Signing key fetch cancelled")]
    Cancelled,
}

impl Retryable for ValidatorError {
    fn is_retryable(&self) -> bool {
        matches!(self, ValidatorError::KeyFetch { transient: true, .. })
    }
}

impl From<Cancelled> for ValidatorError {
    fn from(_: Cancelled) -> Self {
        ValidatorError::Cancelled
    }
}

impl From<ValidatorError> for AppError {
    fn from(err: ValidatorError) -> Self {
        AppError::UpstreamUnavailable {
            support_code: support_codes::KEY_FETCH,
            detail: err.to_string(),
        }
    }
}
