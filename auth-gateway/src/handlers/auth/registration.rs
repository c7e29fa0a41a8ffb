use service_core::{
    axum::{http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::auth::{ConfirmSignUpRequest, ResendConfirmationCodeRequest, SignUpRequest},
    middleware::RequestContext,
    utils::ValidatedJson,
};

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "User signed up", body = SignUpResponse),
        (status = 400, description = "Validation error or weak password", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn sign_up(
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx.dispatcher()?.sign_up(req, &ctx.call_context()).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Confirm a registration with the emailed code
#[utoipa::path(
    post,
    path = "/auth/confirm-sign-up",
    request_body = ConfirmSignUpRequest,
    responses(
        (status = 200, description = "User confirmed", body = MessageResponse),
        (status = 400, description = "Validation error or code mismatch", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn confirm_sign_up(
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<ConfirmSignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx
        .dispatcher()?
        .confirm_sign_up(req, &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Send the confirmation code again
#[utoipa::path(
    post,
    path = "/auth/resend-confirmation-code",
    request_body = ResendConfirmationCodeRequest,
    responses(
        (status = 200, description = "Code resent", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn resend_confirmation_code(
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<ResendConfirmationCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx
        .dispatcher()?
        .resend_confirmation_code(req, &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}
