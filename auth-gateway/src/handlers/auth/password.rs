use service_core::{
    axum::{http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::auth::{ChangePasswordRequest, ConfirmForgotPasswordRequest, ForgotPasswordRequest},
    middleware::{RequestContext, Session},
    utils::ValidatedJson,
};

/// Change the password of the signed-in user
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Wrong previous password or invalid session", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Password",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    ctx: RequestContext,
    Session(session): Session,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx
        .dispatcher()?
        .change_password(&session, req, &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Start a password reset; the provider sends a code
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code sent", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Password"
)]
pub async fn forgot_password(
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx
        .dispatcher()?
        .forgot_password(req, &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Complete a password reset with the code
#[utoipa::path(
    post,
    path = "/auth/confirm-forgot-password",
    request_body = ConfirmForgotPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Validation error or code mismatch", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Password"
)]
pub async fn confirm_forgot_password(
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<ConfirmForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx
        .dispatcher()?
        .confirm_forgot_password(req, &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}
