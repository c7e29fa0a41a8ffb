//! Calls to the identity provider.
//!
//! One function sends every operation: the operation's [`GatewayBinding`]
//! supplies path, provider action and auth scheme as data.
//!
//! [`GatewayBinding`]: crate::models::GatewayBinding

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use service_core::observability::{inject_trace_headers, Redacted};
use service_core::retry::{retry_with_backoff, RetryConfig};
use sha2::Sha256;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::GatewayError;
use crate::config::CognitoConfig;
use crate::models::upstream::ProviderError;
use crate::models::{AuthScheme, Operation, SessionToken};

type HmacSha256 = Hmac<Sha256>;

const AMZ_TARGET_HEADER: &str = "x-amz-target";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// The app client the gateway calls the provider as.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<Secret<String>>,
}

impl ClientCredentials {
    pub fn from_config(config: &CognitoConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// `Base64(HMAC-SHA256(client_secret, username + client_id))`, required
    /// by the provider when the app client has a secret.
    pub fn secret_hash(&self, username: &str) -> Option<String> {
        let secret = self.client_secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
        mac.update(username.as_bytes());
        mac.update(self.client_id.as_bytes());
        Some(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Credential attached to one upstream call.
#[derive(Debug, Clone)]
pub enum UpstreamAuth {
    /// The gateway's client credentials.
    Client,
    /// The calling user's validated access token.
    Session(SessionToken),
}

impl UpstreamAuth {
    pub fn scheme(&self) -> AuthScheme {
        match self {
            UpstreamAuth::Client => AuthScheme::Basic,
            UpstreamAuth::Session(_) => AuthScheme::Bearer,
        }
    }
}

/// Per-call context from the inbound request.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub request_id: Option<String>,
    /// Cancelled when the caller goes away; aborts the call and any retry.
    pub cancel: CancellationToken,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Send `payload` for `operation` and return the provider's JSON result.
    async fn call(
        &self,
        operation: Operation,
        payload: Value,
        auth: UpstreamAuth,
        ctx: &CallContext,
    ) -> Result<Value, GatewayError>;
}

pub struct CognitoClient {
    /// Shared, process-wide connection pool.
    http: reqwest::Client,
    endpoint: String,
    credentials: ClientCredentials,
    timeout: Duration,
    retry: RetryConfig,
}

impl CognitoClient {
    pub fn new(http: reqwest::Client, config: &CognitoConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            credentials: ClientCredentials::from_config(config),
            timeout: config.timeout,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn send_once(
        &self,
        operation: Operation,
        payload: &Value,
        auth: &UpstreamAuth,
        ctx: &CallContext,
    ) -> Result<Value, GatewayError> {
        let binding = operation.binding();
        let url = format!("{}{}", self.endpoint, binding.path);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(AMZ_JSON));
        headers.insert(AMZ_TARGET_HEADER, HeaderValue::from_static(binding.target));
        inject_trace_headers(&mut headers, ctx.request_id.as_deref());

        let request = self
            .http
            .post(&url)
            .headers(headers)
            .timeout(self.timeout)
            .json(payload);
        let request = match auth {
            UpstreamAuth::Client => request.basic_auth(
                &self.credentials.client_id,
                self.credentials
                    .client_secret
                    .as_ref()
                    .map(|s| s.expose_secret()),
            ),
            UpstreamAuth::Session(token) => request.bearer_auth(token.expose()),
        };

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::transport(&e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::transport(&e))?;

        debug!(
            operation = %operation,
            status = status.as_u16(),
            body = %Redacted::from_bytes(&body),
            "Identity provider response"
        );

        if status.is_success() {
            if body.is_empty() {
                return Ok(Value::Object(Default::default()));
            }
            return serde_json::from_slice(&body).map_err(|e| {
                GatewayError::Internal(anyhow::anyhow!(
                    "Unparseable {} response from identity provider: {}",
                    operation,
                    e
                ))
            });
        }

        let provider_error: Option<ProviderError> = serde_json::from_slice(&body).ok();
        let exception = provider_error.as_ref().and_then(|e| e.exception_name());
        let err = GatewayError::from_provider(operation, status, exception);
        warn!(
            operation = %operation,
            status = status.as_u16(),
            exception = exception.unwrap_or("-"),
            provider_message = provider_error
                .as_ref()
                .and_then(|e| e.message.as_deref())
                .unwrap_or("-"),
            error = %err,
            "Identity provider returned an error"
        );
        Err(err)
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    async fn call(
        &self,
        operation: Operation,
        payload: Value,
        auth: UpstreamAuth,
        ctx: &CallContext,
    ) -> Result<Value, GatewayError> {
        let binding = operation.binding();
        if auth.scheme() != binding.scheme {
            return Err(GatewayError::Internal(anyhow::anyhow!(
                "{} must be sent with {:?} auth, got {:?}",
                operation,
                binding.scheme,
                auth.scheme()
            )));
        }

        // Writes are sent at most once.
        let retry = if binding.replay_safe {
            self.retry.clone()
        } else {
            RetryConfig::no_retry()
        };

        info!(
            operation = %operation,
            target = binding.target,
            payload = %Redacted::new(&payload),
            "Calling identity provider"
        );

        retry_with_backoff(&retry, operation.as_str(), &ctx.cancel, || {
            self.send_once(operation, &payload, &auth, ctx)
        })
        .await
    }
}
