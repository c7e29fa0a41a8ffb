//! Per-request context: correlation id, registry scope and cancellation.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use service_core::middleware::RequestId;
use service_core::registry::Scope;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::services::{AuthDispatcher, CallContext};
use crate::AppState;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: Option<String>,
    scope: Arc<Scope>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// The dispatcher instance for this request.
    pub fn dispatcher(&self) -> Result<Arc<AuthDispatcher>, AppError> {
        Ok(self.scope.resolve::<AuthDispatcher>()?)
    }

    pub fn call_context(&self) -> CallContext {
        CallContext {
            request_id: self.request_id.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

/// Open a registry scope for the request and tie upstream calls to its
/// lifetime. The token is cancelled when the request future is dropped
/// (client went away) or the process shuts down.
pub async fn request_context_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let request_id = req.extensions().get::<RequestId>().map(|id| id.0.clone());
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    req.extensions_mut().insert(RequestContext {
        request_id,
        scope: Arc::new(state.registry.create_scope()),
        cancel,
    });

    next.run(req).await
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Request context missing from request extensions"
                ))
            })
    }
}
