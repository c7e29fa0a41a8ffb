use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::AuthenticatedSession;
use crate::AppState;

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(strip_bearer)
}

/// The credential of a `Bearer <credential>` header value. The scheme name
/// is case-insensitive (RFC 7235).
pub fn strip_bearer(value: &str) -> Option<&str> {
    let (scheme, credential) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let credential = credential.trim();
    (!credential.is_empty()).then_some(credential)
}

/// Require a valid session token before the request reaches the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
    })?;

    let session = state.validator.authenticate(token).await?;

    // Handlers read the session through the `Session` extractor.
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

/// Extractor for the session established by [`auth_middleware`].
pub struct Session(pub AuthenticatedSession);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedSession>()
            .cloned()
            .map(Session)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Session missing from request extensions"
                ))
            })
    }
}
