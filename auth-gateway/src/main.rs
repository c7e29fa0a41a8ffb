use auth_gateway::{
    build_registry, build_router,
    config::GatewayConfig,
    services::{ClientCredentials, CognitoClient, CredentialValidator, HttpKeySource},
    AppState,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = Arc::new(GatewayConfig::from_env()?);

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting credential gateway"
    );

    let shutdown = CancellationToken::new();

    // One connection pool for every upstream call
    let http = reqwest::Client::builder()
        .user_agent(format!(
            "{}/{}",
            config.service_name, config.service_version
        ))
        .build()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

    let key_source = HttpKeySource::new(
        http.clone(),
        config.jwks.url.clone(),
        config.cognito.timeout,
        shutdown.clone(),
    );
    let validator = Arc::new(
        CredentialValidator::new(Arc::new(key_source), config.cognito.issuer())
            .with_min_refetch_interval(config.jwks.min_refetch_interval),
    );

    let credentials = Arc::new(ClientCredentials::from_config(&config.cognito));
    let provider = Arc::new(CognitoClient::new(http, &config.cognito));
    let registry = build_registry(provider, credentials);
    tracing::info!(endpoint = %config.cognito.endpoint, "Identity provider client initialized");

    match validator.refresh_keys().await {
        Ok(()) => tracing::info!(
            keys = validator.key_count().await,
            "Signing keys loaded"
        ),
        Err(e) => tracing::warn!(
            error = %e,
            "Initial signing key fetch failed, keys will be fetched on demand"
        ),
    }
    let refresher = Arc::clone(&validator)
        .spawn_refresher(config.jwks.refresh_interval, shutdown.clone());

    let state = AppState {
        config: Arc::clone(&config),
        validator,
        registry,
        shutdown: shutdown.clone(),
    };
    let app = build_router(state)?;

    let addr = config.common.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Listening");

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    if let Err(e) = refresher.await {
        tracing::warn!(error = %e, "Signing key refresher ended abnormally");
    }

    tracing::info!("Service shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM and cancels `shutdown` so in-flight
/// upstream calls abort.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
