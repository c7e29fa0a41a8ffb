//! Bearer token validation against the user pool's cached signing keys.
//!
//! Steady-state validation never touches the network: keys are fetched
//! lazily, refreshed on an interval, and refetched at most once per call when
//! a token names an unknown key or fails signature verification. Such forced
//! refetches are spaced by a minimum interval; inside it the token fails
//! closed against the cached keys. Readers see either the old or the new key
//! set, never a partial one.

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, jwk::JwkSet, Algorithm, DecodingKey, Validation,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::retry::{retry_with_backoff, RetryConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::error::ValidatorError;
use crate::models::{AuthenticatedSession, SessionToken};

/// Default spacing between refetches triggered by tokens.
pub const DEFAULT_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

/// Claims of a user pool access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Malformed,
    UnsupportedAlgorithm,
    Expired,
    UntrustedIssuer,
    WrongTokenUse,
    UnknownKey,
    SignatureMismatch,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Malformed => "malformed",
            InvalidReason::UnsupportedAlgorithm => "unsupported_algorithm",
            InvalidReason::Expired => "expired",
            InvalidReason::UntrustedIssuer => "untrusted_issuer",
            InvalidReason::WrongTokenUse => "wrong_token_use",
            InvalidReason::UnknownKey => "unknown_key",
            InvalidReason::SignatureMismatch => "signature_mismatch",
        }
    }

    fn from_jwt_error(err: &jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => InvalidReason::Expired,
            ErrorKind::InvalidIssuer => InvalidReason::UntrustedIssuer,
            ErrorKind::InvalidSignature => InvalidReason::SignatureMismatch,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                InvalidReason::UnsupportedAlgorithm
            }
            _ => InvalidReason::Malformed,
        }
    }
}

/// Routine outcome of validating a token.
#[derive(Debug, Clone)]
pub struct TokenValidation {
    pub valid: bool,
    pub claims: Option<Claims>,
    pub reason: Option<InvalidReason>,
}

impl TokenValidation {
    fn accepted(claims: Claims) -> Self {
        Self {
            valid: true,
            claims: Some(claims),
            reason: None,
        }
    }

    fn rejected(reason: InvalidReason) -> Self {
        debug!(reason = reason.as_str(), "Token rejected");
        Self {
            valid: false,
            claims: None,
            reason: Some(reason),
        }
    }
}

/// Where signing keys come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, ValidatorError>;
}

/// Fetches the user pool's JWKS over HTTP, retrying transient failures.
pub struct HttpKeySource {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    retry: RetryConfig,
    shutdown: CancellationToken,
}

impl HttpKeySource {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
            retry: RetryConfig::default(),
            shutdown,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self) -> Result<JwkSet, ValidatorError> {
        let response = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ValidatorError::KeyFetch {
                detail: e.to_string(),
                transient: true,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidatorError::KeyFetch {
                detail: format!("key endpoint returned {}", status),
                transient: status.is_server_error(),
            });
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| ValidatorError::KeyFetch {
                detail: format!("unreadable key set: {}", e),
                transient: false,
            })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, ValidatorError> {
        retry_with_backoff(&self.retry, "jwks_fetch", &self.shutdown, || {
            self.fetch_once()
        })
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refresh {
    /// Start-up or interval refresh; always fetches.
    Scheduled,
    /// A token named an unknown key or failed verification.
    Forced,
}

#[derive(Default)]
struct RefreshState {
    last_forced: Option<Instant>,
}

struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    generation: u64,
}

impl KeyCache {
    fn from_jwks(jwks: &JwkSet, generation: u64) -> Self {
        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                warn!("Skipping signing key without kid");
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!(kid = %kid, error = %e, "Skipping unusable signing key"),
            }
        }
        Self { keys, generation }
    }
}

pub struct CredentialValidator {
    source: Arc<dyn KeySource>,
    cache: RwLock<Arc<KeyCache>>,
    /// Serialises fetches; the generation lets waiters skip a fetch that
    /// finished while they queued.
    refresh_lock: Mutex<RefreshState>,
    min_refetch_interval: Duration,
    issuer: String,
}

impl CredentialValidator {
    pub fn new(source: Arc<dyn KeySource>, issuer: impl Into<String>) -> Self {
        Self {
            source,
            cache: RwLock::new(Arc::new(KeyCache {
                keys: HashMap::new(),
                generation: 0,
            })),
            refresh_lock: Mutex::new(RefreshState::default()),
            min_refetch_interval: DEFAULT_MIN_REFETCH_INTERVAL,
            issuer: issuer.into(),
        }
    }

    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub async fn key_count(&self) -> usize {
        self.cache.read().await.keys.len()
    }

    /// Check structure, expiry, issuer and token use, then the signature.
    ///
    /// Routine invalidity is `Ok` with `valid == false`; only a failed key
    /// fetch is an error.
    pub async fn validate(&self, token: &str) -> Result<TokenValidation, ValidatorError> {
        let header = match decode_header(token) {
            Ok(header) => header,
            Err(_) => return Ok(TokenValidation::rejected(InvalidReason::Malformed)),
        };
        if header.alg != Algorithm::RS256 {
            return Ok(TokenValidation::rejected(
                InvalidReason::UnsupportedAlgorithm,
            ));
        }
        let Some(kid) = header.kid else {
            return Ok(TokenValidation::rejected(InvalidReason::Malformed));
        };

        // Claims first: expired or foreign tokens are rejected without keys.
        let claims = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(&[]),
            &self.validation(false),
        ) {
            Ok(data) => data.claims,
            Err(e) => return Ok(TokenValidation::rejected(InvalidReason::from_jwt_error(&e))),
        };
        if claims.token_use.as_deref().is_some_and(|u| u != "access") {
            return Ok(TokenValidation::rejected(InvalidReason::WrongTokenUse));
        }

        let mut cache = self.cache.read().await.clone();
        let mut refetched = false;

        if !cache.keys.contains_key(&kid) {
            cache = self.refresh_after(cache.generation, Refresh::Forced).await?;
            refetched = true;
        }
        let Some(key) = cache.keys.get(&kid) else {
            return Ok(TokenValidation::rejected(InvalidReason::UnknownKey));
        };

        match self.verify(token, key) {
            Ok(claims) => Ok(TokenValidation::accepted(claims)),
            Err(InvalidReason::SignatureMismatch) if !refetched => {
                // The pool may have rotated a key under the same kid.
                let cache = self.refresh_after(cache.generation, Refresh::Forced).await?;
                let outcome = match cache.keys.get(&kid) {
                    Some(key) => match self.verify(token, key) {
                        Ok(claims) => TokenValidation::accepted(claims),
                        Err(reason) => TokenValidation::rejected(reason),
                    },
                    None => TokenValidation::rejected(InvalidReason::UnknownKey),
                };
                Ok(outcome)
            }
            Err(reason) => Ok(TokenValidation::rejected(reason)),
        }
    }

    /// Validate `token` and wrap it as a session for authenticated calls.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedSession, AppError> {
        let TokenValidation {
            valid,
            claims,
            reason,
        } = self.validate(token).await?;

        match (valid, claims) {
            (true, Some(claims)) => Ok(AuthenticatedSession::new(
                SessionToken::new(token),
                claims,
            )),
            _ if reason == Some(InvalidReason::Expired) => Err(AppError::TokenExpired),
            _ => Err(AppError::Unauthorized(anyhow::anyhow!(
                "Invalid bearer token: {}",
                reason.map(|r| r.as_str()).unwrap_or("unknown")
            ))),
        }
    }

    /// Replace the key set with a fresh fetch. On failure the previous set
    /// stays in place.
    pub async fn refresh_keys(&self) -> Result<(), ValidatorError> {
        let generation = self.cache.read().await.generation;
        self.refresh_after(generation, Refresh::Scheduled)
            .await
            .map(|_| ())
    }

    pub fn spawn_refresher(
        self: Arc<Self>,
        every: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Signing key refresher stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.refresh_keys().await {
                            warn!(error = %e, "Signing key refresh failed, keeping previous key set");
                        }
                    }
                }
            }
        })
    }

    async fn refresh_after(
        &self,
        seen_generation: u64,
        trigger: Refresh,
    ) -> Result<Arc<KeyCache>, ValidatorError> {
        let mut state = self.refresh_lock.lock().await;

        let current = self.cache.read().await.clone();
        if current.generation > seen_generation {
            return Ok(current);
        }

        // An empty cache is always worth a fetch.
        if trigger == Refresh::Forced && !current.keys.is_empty() {
            let now = Instant::now();
            if let Some(last) = state.last_forced {
                if now.duration_since(last) < self.min_refetch_interval {
                    debug!("Forced key refetch suppressed, using cached keys");
                    return Ok(current);
                }
            }
            state.last_forced = Some(now);
        }

        let jwks = self.source.fetch().await?;
        let next = Arc::new(KeyCache::from_jwks(&jwks, current.generation + 1));
        *self.cache.write().await = next.clone();

        info!(
            keys = next.keys.len(),
            generation = next.generation,
            "Signing keys refreshed"
        );
        Ok(next)
    }

    fn verify(&self, token: &str, key: &DecodingKey) -> Result<Claims, InvalidReason> {
        decode::<Claims>(token, key, &self.validation(true))
            .map(|data| data.claims)
            .map_err(|e| InvalidReason::from_jwt_error(&e))
    }

    fn validation(&self, check_signature: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        if !check_signature {
            validation.insecure_disable_signature_validation();
        }
        // A token is expired the second its exp passes.
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}
