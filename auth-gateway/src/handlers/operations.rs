use service_core::{
    axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    middleware::{bearer_token, RequestContext},
    models::AuthRequest,
    utils::AppJson,
    AppState,
};

/// `POST /auth/operations`: any operation as `{"operation": ..., "payload": ...}`.
///
/// The bearer token is only checked when the named operation needs a
/// session.
pub async fn dispatch_operation(
    State(state): State<AppState>,
    ctx: RequestContext,
    headers: HeaderMap,
    AppJson(request): AppJson<AuthRequest>,
) -> Result<impl IntoResponse, AppError> {
    let operation = request.operation();

    let session = if operation.requires_session() {
        let token = bearer_token(&headers).ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("{} requires a bearer token", operation))
        })?;
        Some(state.validator.authenticate(token).await?)
    } else {
        None
    };

    tracing::debug!(operation = %operation, "Dispatching operation");
    let res = ctx
        .dispatcher()?
        .dispatch(request, session.as_ref(), &ctx.call_context())
        .await?;
    Ok((StatusCode::OK, Json(res)))
}
