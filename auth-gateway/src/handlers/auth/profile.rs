use service_core::{
    axum::{http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::auth::UpdateUserAttributesRequest,
    middleware::{RequestContext, Session},
    utils::ValidatedJson,
};

/// Update attributes of the signed-in user
#[utoipa::path(
    post,
    path = "/auth/update-user-attributes",
    request_body = UpdateUserAttributesRequest,
    responses(
        (status = 200, description = "Attributes updated", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid session", body = ErrorResponse),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "Profile",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user_attributes(
    ctx: RequestContext,
    Session(session): Session,
    ValidatedJson(req): ValidatedJson<UpdateUserAttributesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = ctx
        .dispatcher()?
        .update_user_attributes(&session, req, &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}
