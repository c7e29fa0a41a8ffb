use service_core::{
    axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};
use validator::Validate;

use crate::{
    dtos::auth::{IntrospectRequest, IntrospectResponse, LoginRequest, TokenRefreshRequest},
    middleware::{strip_bearer, RequestContext},
    utils::{AppJson, ValidatedJson},
    AppState,
};

/// Legacy carrier of the refresh token: `Refresh-Token: Bearer <token>`.
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// Login with username and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Email not confirmed", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx.dispatcher()?.login(req, &ctx.call_context()).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Exchange a refresh token for new access and id tokens
#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    request_body = TokenRefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenRefreshResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh_token(
    ctx: RequestContext,
    headers: HeaderMap,
    body: Option<Json<TokenRefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let mut req = body.map(|Json(req)| req).unwrap_or_default();

    if req.refresh_token.is_empty() {
        if let Some(token) = legacy_refresh_token(&headers) {
            tracing::warn!("Refresh token supplied in deprecated Refresh-Token header");
            req.refresh_token = token.to_string();
        }
    }
    req.validate()?;

    let res = ctx
        .dispatcher()?
        .refresh_token(req, &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}

fn legacy_refresh_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(strip_bearer)
}

/// Check a session token and return its claims
#[utoipa::path(
    post,
    path = "/auth/introspect",
    request_body = IntrospectRequest,
    responses(
        (status = 200, description = "Validation result", body = IntrospectResponse),
        (status = 503, description = "Signing keys unavailable", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn introspect(
    State(state): State<AppState>,
    AppJson(req): AppJson<IntrospectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.validator.validate(&req.token).await?;

    Ok((
        StatusCode::OK,
        Json(IntrospectResponse {
            active: result.valid,
            reason: result.reason.map(|r| r.as_str().to_string()),
            claims: result.claims,
        }),
    ))
}
