pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use service_core::registry::{Lifetime, ServiceRegistry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};

use crate::config::GatewayConfig;
use crate::services::{AuthDispatcher, ClientCredentials, CredentialValidator, IdentityProvider};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::session::login,
        handlers::auth::session::refresh_token,
        handlers::auth::session::introspect,
        handlers::auth::registration::sign_up,
        handlers::auth::registration::confirm_sign_up,
        handlers::auth::registration::resend_confirmation_code,
        handlers::auth::password::change_password,
        handlers::auth::password::forgot_password,
        handlers::auth::password::confirm_forgot_password,
        handlers::auth::profile::update_user_attributes,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::SignUpRequest,
            dtos::auth::SignUpResponse,
            dtos::auth::ConfirmSignUpRequest,
            dtos::auth::ResendConfirmationCodeRequest,
            dtos::auth::TokenRefreshRequest,
            dtos::auth::TokenRefreshResponse,
            dtos::auth::ChangePasswordRequest,
            dtos::auth::ForgotPasswordRequest,
            dtos::auth::ConfirmForgotPasswordRequest,
            dtos::auth::UpdateUserAttributesRequest,
            dtos::auth::UserAttribute,
            dtos::auth::MessageResponse,
            dtos::auth::IntrospectRequest,
            dtos::auth::IntrospectResponse,
            services::Claims,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, token refresh and introspection"),
        (name = "Registration", description = "Sign-up and confirmation"),
        (name = "Password", description = "Password change and reset"),
        (name = "Profile", description = "User attributes"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub validator: Arc<CredentialValidator>,
    pub registry: Arc<ServiceRegistry>,
    /// Cancelled on shutdown; every request's token is a child of it.
    pub shutdown: CancellationToken,
}

/// Bind the identity provider (one per process) and the dispatcher (one per
/// request scope). Each dispatcher is handed whatever provider is bound when
/// its scope first asks for it.
pub fn build_registry(
    provider: Arc<dyn IdentityProvider>,
    credentials: Arc<ClientCredentials>,
) -> Arc<ServiceRegistry> {
    let registry = Arc::new(ServiceRegistry::new());

    registry.register_instance::<dyn IdentityProvider>(provider);
    registry.register::<AuthDispatcher, _>(Lifetime::Scoped, move |registry| {
        Ok(Arc::new(AuthDispatcher::new(
            registry.resolve::<dyn IdentityProvider>()?,
            Arc::clone(&credentials),
        )))
    });

    registry
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let session_routes = Router::new()
        .route(
            "/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route(
            "/auth/update-user-attributes",
            post(handlers::auth::update_user_attributes),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                tracing::error!("Ignoring invalid CORS origin '{}': {}", o, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/sign-up", post(handlers::auth::sign_up))
        .route("/auth/confirm-sign-up", post(handlers::auth::confirm_sign_up))
        .route(
            "/auth/resend-confirmation-code",
            post(handlers::auth::resend_confirmation_code),
        )
        .route("/auth/refresh-token", post(handlers::auth::refresh_token))
        .route("/auth/forgot-password", post(handlers::auth::forgot_password))
        .route(
            "/auth/confirm-forgot-password",
            post(handlers::auth::confirm_forgot_password),
        )
        .route("/auth/introspect", post(handlers::auth::introspect))
        .route(
            "/auth/operations",
            post(handlers::operations::dispatch_operation),
        )
        .merge(session_routes)
        .with_state(state.clone())
        // Per-request registry scope and cancellation token
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_context_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::HeaderName::from_static("refresh-token"),
                    header::HeaderName::from_static("x-request-id"),
                ]),
        );

    Ok(app)
}

/// Placeholder root; the gateway's operations live under `/auth`.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let signing_keys = state.validator.key_count().await;

    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "signing_keys": signing_keys
        }
    }))
}
