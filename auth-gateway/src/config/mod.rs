use reqwest::Url;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Gateway configuration, built once at start-up and passed explicitly to
/// every component.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub cognito: CognitoConfig,
    pub jwks: JwksConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct CognitoConfig {
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
    pub client_secret: Option<Secret<String>>,
    /// Base URL of the identity provider API, without a trailing slash.
    pub endpoint: String,
    pub timeout: Duration,
}

impl CognitoConfig {
    /// The `iss` claim every accepted token must carry.
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct JwksConfig {
    pub url: String,
    pub refresh_interval: Duration,
    /// Spacing between key refetches triggered by unknown kids or failed
    /// signatures.
    pub min_refetch_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Production;

        let region = get_env("AWS_REGION", Some("us-east-1"), is_prod)?;
        let user_pool_id = get_env("AWS_COGNITO_USER_POOL_ID", None, is_prod)?;
        let default_endpoint = format!("https://cognito-idp.{}.amazonaws.com", region);

        let cognito = CognitoConfig {
            client_id: get_env("AWS_COGNITO_CLIENT_ID", None, is_prod)?,
            client_secret: env::var("AWS_COGNITO_CLIENT_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(Secret::new),
            endpoint: get_env("COGNITO_ENDPOINT", Some(default_endpoint.as_str()), false)?
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(parse_env(
                "UPSTREAM_TIMEOUT_SECONDS",
                get_env("UPSTREAM_TIMEOUT_SECONDS", Some("10"), false)?,
            )?),
            region,
            user_pool_id,
        };

        let default_jwks_url = format!("{}/.well-known/jwks.json", cognito.issuer());
        let jwks = JwksConfig {
            url: get_env("JWKS_URL", Some(default_jwks_url.as_str()), false)?,
            refresh_interval: Duration::from_secs(parse_env(
                "JWKS_REFRESH_INTERVAL_SECONDS",
                get_env("JWKS_REFRESH_INTERVAL_SECONDS", Some("3600"), false)?,
            )?),
            min_refetch_interval: Duration::from_secs(parse_env(
                "JWKS_MIN_REFETCH_SECONDS",
                get_env("JWKS_MIN_REFETCH_SECONDS", Some("30"), false)?,
            )?),
        };

        let config = GatewayConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("auth-gateway"), is_prod)?,
            service_version: get_env(
                "SERVICE_VERSION",
                Some(env!("CARGO_PKG_VERSION")),
                is_prod,
            )?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            cognito,
            jwks,
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(config_error("PORT must be greater than 0"));
        }

        let cognito = &self.cognito;
        if cognito.region.is_empty() {
            return Err(config_error("AWS_REGION must not be empty"));
        }
        if cognito.client_id.is_empty() {
            return Err(config_error("AWS_COGNITO_CLIENT_ID must not be empty"));
        }
        if !cognito
            .user_pool_id
            .starts_with(&format!("{}_", cognito.region))
        {
            return Err(config_error(format!(
                "AWS_COGNITO_USER_POOL_ID '{}' does not belong to region '{}'",
                cognito.user_pool_id, cognito.region
            )));
        }
        if cognito.timeout.is_zero() {
            return Err(config_error("UPSTREAM_TIMEOUT_SECONDS must be positive"));
        }
        if self.jwks.refresh_interval.is_zero() {
            return Err(config_error("JWKS_REFRESH_INTERVAL_SECONDS must be positive"));
        }

        for (key, url) in [
            ("COGNITO_ENDPOINT", cognito.endpoint.as_str()),
            ("JWKS_URL", self.jwks.url.as_str()),
        ] {
            Url::parse(url)
                .map_err(|e| config_error(format!("{} is not a valid URL: {}", key, e)))?;
        }

        if self.environment == Environment::Production
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(config_error(
                "Wildcard CORS origin not allowed in production",
            ));
        }

        Ok(())
    }
}

fn config_error(message: impl std::fmt::Display) -> AppError {
    AppError::ConfigError(anyhow::anyhow!("{}", message))
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env(key: &str, value: String) -> Result<u64, AppError> {
    value.trim().parse().map_err(|e: std::num::ParseIntError| {
        AppError::ConfigError(anyhow::anyhow!("{} is not a valid number: {}", key, e))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
