use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::{AppError, ErrorCode};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use super::upstream::{CallContext, ClientCredentials, IdentityProvider, UpstreamAuth};
use crate::dtos::auth::{
    ChangePasswordRequest, ConfirmForgotPasswordRequest, ConfirmSignUpRequest,
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    ResendConfirmationCodeRequest, SignUpRequest, SignUpResponse, TokenRefreshRequest,
    TokenRefreshResponse, UpdateUserAttributesRequest,
};
use crate::models::upstream::{
    self, AttributeType, InitiateAuthResult, MessageResult, SignUpResult, UsernameOnly,
    REFRESH_TOKEN_AUTH, USER_PASSWORD_AUTH,
};
use crate::models::{AuthRequest, AuthResponse, AuthenticatedSession, Operation, ResponseShape};

pub const TOKEN_TYPE: &str = "Bearer";

/// A provider result read according to its operation's response shape.
enum ProviderResult {
    Tokens(upstream::AuthenticationResult),
    SignUp { message: String, result: SignUpResult },
    Message(String),
}

impl ProviderResult {
    fn read(operation: Operation, value: Value) -> Result<Self, AppError> {
        match operation.binding().shape {
            ResponseShape::Tokens => Ok(Self::Tokens(authentication_result(operation, value)?)),
            ResponseShape::RefreshedTokens => {
                let mut tokens = authentication_result(operation, value)?;
                tokens.refresh_token = None;
                Ok(Self::Tokens(tokens))
            }
            ResponseShape::SignUp => Ok(Self::SignUp {
                message: message_of(operation, &value),
                result: decode(operation, value)?,
            }),
            ResponseShape::Message => Ok(Self::Message(message_of(operation, &value))),
        }
    }

    fn into_tokens(self, operation: Operation) -> Result<upstream::AuthenticationResult, AppError> {
        match self {
            Self::Tokens(tokens) => Ok(tokens),
            _ => Err(shape_mismatch(operation)),
        }
    }

    fn into_message(self, operation: Operation) -> Result<String, AppError> {
        match self {
            Self::Message(message) => Ok(message),
            _ => Err(shape_mismatch(operation)),
        }
    }
}

fn shape_mismatch(operation: Operation) -> AppError {
    AppError::InternalError(anyhow::anyhow!(
        "{} is bound to a different response shape",
        operation
    ))
}

fn default_message(operation: Operation) -> &'static str {
    match operation {
        Operation::SignUp => "User signed up successfully",
        Operation::ConfirmSignUp => "User confirmed successfully",
        Operation::ResendConfirmationCode => "Confirmation code resent successfully",
        Operation::ChangePassword => "Password changed successfully",
        Operation::ForgotPassword => "Password reset code sent successfully",
        Operation::ConfirmForgotPassword => "Password reset successfully",
        Operation::UpdateUserAttributes => "User attributes updated successfully",
        Operation::Login | Operation::RefreshToken => "",
    }
}

/// Turns validated caller requests into provider calls and provider results
/// into caller responses. Holds no per-request state.
pub struct AuthDispatcher {
    provider: Arc<dyn IdentityProvider>,
    credentials: Arc<ClientCredentials>,
}

impl AuthDispatcher {
    pub fn new(provider: Arc<dyn IdentityProvider>, credentials: Arc<ClientCredentials>) -> Self {
        Self {
            provider,
            credentials,
        }
    }

    /// Route any operation. Bearer operations need `session`.
    pub async fn dispatch(
        &self,
        request: AuthRequest,
        session: Option<&AuthenticatedSession>,
        ctx: &CallContext,
    ) -> Result<AuthResponse, AppError> {
        let operation = request.operation();
        let session = match (operation.requires_session(), session) {
            (true, None) => {
                return Err(AppError::Unauthorized(anyhow::anyhow!(
                    "{} requires an authenticated session",
                    operation
                )))
            }
            (_, session) => session,
        };

        let response = match request {
            AuthRequest::Login(req) => AuthResponse::Login(self.login(req, ctx).await?),
            AuthRequest::SignUp(req) => AuthResponse::SignUp(self.sign_up(req, ctx).await?),
            AuthRequest::ConfirmSignUp(req) => {
                AuthResponse::ConfirmSignUp(self.confirm_sign_up(req, ctx).await?)
            }
            AuthRequest::ResendConfirmationCode(req) => AuthResponse::ResendConfirmationCode(
                self.resend_confirmation_code(req, ctx).await?,
            ),
            AuthRequest::RefreshToken(req) => {
                AuthResponse::RefreshToken(self.refresh_token(req, ctx).await?)
            }
            AuthRequest::ChangePassword(req) => AuthResponse::ChangePassword(
                self.change_password(require(session)?, req, ctx).await?,
            ),
            AuthRequest::ForgotPassword(req) => {
                AuthResponse::ForgotPassword(self.forgot_password(req, ctx).await?)
            }
            AuthRequest::ConfirmForgotPassword(req) => AuthResponse::ConfirmForgotPassword(
                self.confirm_forgot_password(req, ctx).await?,
            ),
            AuthRequest::UpdateUserAttributes(req) => AuthResponse::UpdateUserAttributes(
                self.update_user_attributes(require(session)?, req, ctx)
                    .await?,
            ),
        };
        Ok(response)
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        ctx: &CallContext,
    ) -> Result<LoginResponse, AppError> {
        req.validate()?;

        let mut params = BTreeMap::from([
            ("USERNAME", req.username.clone()),
            ("PASSWORD", req.password),
        ]);
        if let Some(hash) = self.credentials.secret_hash(&req.username) {
            params.insert("SECRET_HASH", hash);
        }
        let body = upstream::InitiateAuth {
            auth_flow: USER_PASSWORD_AUTH,
            client_id: self.credentials.client_id.clone(),
            auth_parameters: params,
        };

        let result = self
            .send(Operation::Login, &body, UpstreamAuth::Client, ctx)
            .await?
            .into_tokens(Operation::Login)?;

        tracing::info!(operation = %Operation::Login, "Login succeeded");
        Ok(LoginResponse {
            access_token: result.access_token,
            token_type: TOKEN_TYPE.to_string(),
            refresh_token: result.refresh_token,
            id_token: result.id_token,
        })
    }

    pub async fn sign_up(
        &self,
        req: SignUpRequest,
        ctx: &CallContext,
    ) -> Result<SignUpResponse, AppError> {
        req.validate()?;

        let mut attributes = vec![AttributeType {
            name: "email".to_string(),
            value: req.email,
        }];
        for (name, value) in [
            ("phone_number", req.phone_number),
            ("given_name", req.given_name),
            ("family_name", req.family_name),
        ] {
            if let Some(value) = value {
                attributes.push(AttributeType {
                    name: name.to_string(),
                    value,
                });
            }
        }

        let body = upstream::SignUp {
            client_id: self.credentials.client_id.clone(),
            secret_hash: self.credentials.secret_hash(&req.username),
            username: req.username,
            password: req.password,
            user_attributes: attributes,
        };

        let (message, result) = match self
            .send(Operation::SignUp, &body, UpstreamAuth::Client, ctx)
            .await?
        {
            ProviderResult::SignUp { message, result } => (message, result),
            _ => return Err(shape_mismatch(Operation::SignUp)),
        };

        tracing::info!(
            operation = %Operation::SignUp,
            user_confirmed = result.user_confirmed,
            "User signed up"
        );
        Ok(SignUpResponse {
            message,
            user_sub: result.user_sub,
        })
    }

    pub async fn confirm_sign_up(
        &self,
        req: ConfirmSignUpRequest,
        ctx: &CallContext,
    ) -> Result<MessageResponse, AppError> {
        req.validate()?;

        let body = upstream::ConfirmSignUp {
            client_id: self.credentials.client_id.clone(),
            secret_hash: self.credentials.secret_hash(&req.username),
            username: req.username,
            confirmation_code: req.confirmation_code,
        };
        self.send_for_message(Operation::ConfirmSignUp, &body, UpstreamAuth::Client, ctx)
            .await
    }

    pub async fn resend_confirmation_code(
        &self,
        req: ResendConfirmationCodeRequest,
        ctx: &CallContext,
    ) -> Result<MessageResponse, AppError> {
        req.validate()?;

        let body = UsernameOnly {
            client_id: self.credentials.client_id.clone(),
            secret_hash: self.credentials.secret_hash(&req.username),
            username: req.username,
        };
        self.send_for_message(
            Operation::ResendConfirmationCode,
            &body,
            UpstreamAuth::Client,
            ctx,
        )
        .await
    }

    pub async fn refresh_token(
        &self,
        req: TokenRefreshRequest,
        ctx: &CallContext,
    ) -> Result<TokenRefreshResponse, AppError> {
        req.validate()?;

        let body = upstream::InitiateAuth {
            auth_flow: REFRESH_TOKEN_AUTH,
            client_id: self.credentials.client_id.clone(),
            auth_parameters: BTreeMap::from([("REFRESH_TOKEN", req.refresh_token)]),
        };

        let result = self
            .send(Operation::RefreshToken, &body, UpstreamAuth::Client, ctx)
            .await?
            .into_tokens(Operation::RefreshToken)?;

        Ok(TokenRefreshResponse {
            access_token: result.access_token,
            token_type: TOKEN_TYPE.to_string(),
            id_token: result.id_token,
        })
    }

    pub async fn change_password(
        &self,
        session: &AuthenticatedSession,
        req: ChangePasswordRequest,
        ctx: &CallContext,
    ) -> Result<MessageResponse, AppError> {
        req.validate()?;

        let body = upstream::ChangePassword {
            access_token: session.token().expose().to_string(),
            previous_password: req.previous_password,
            proposed_password: req.proposed_password,
        };
        self.send_for_message(
            Operation::ChangePassword,
            &body,
            UpstreamAuth::Session(session.token().clone()),
            ctx,
        )
        .await
    }

    pub async fn forgot_password(
        &self,
        req: ForgotPasswordRequest,
        ctx: &CallContext,
    ) -> Result<MessageResponse, AppError> {
        req.validate()?;

        let body = UsernameOnly {
            client_id: self.credentials.client_id.clone(),
            secret_hash: self.credentials.secret_hash(&req.username),
            username: req.username,
        };
        self.send_for_message(Operation::ForgotPassword, &body, UpstreamAuth::Client, ctx)
            .await
    }

    pub async fn confirm_forgot_password(
        &self,
        req: ConfirmForgotPasswordRequest,
        ctx: &CallContext,
    ) -> Result<MessageResponse, AppError> {
        req.validate()?;

        let body = upstream::ConfirmForgotPassword {
            client_id: self.credentials.client_id.clone(),
            secret_hash: self.credentials.secret_hash(&req.username),
            username: req.username,
            confirmation_code: req.confirmation_code,
            password: req.new_password,
        };
        self.send_for_message(
            Operation::ConfirmForgotPassword,
            &body,
            UpstreamAuth::Client,
            ctx,
        )
        .await
    }

    pub async fn update_user_attributes(
        &self,
        session: &AuthenticatedSession,
        req: UpdateUserAttributesRequest,
        ctx: &CallContext,
    ) -> Result<MessageResponse, AppError> {
        req.validate()?;

        let body = upstream::UpdateUserAttributes {
            access_token: session.token().expose().to_string(),
            user_attributes: req
                .attributes
                .into_iter()
                .map(|attr| AttributeType {
                    name: attr.name,
                    value: attr.value,
                })
                .collect(),
        };
        self.send_for_message(
            Operation::UpdateUserAttributes,
            &body,
            UpstreamAuth::Session(session.token().clone()),
            ctx,
        )
        .await
    }

    async fn send<B: Serialize>(
        &self,
        operation: Operation,
        body: &B,
        auth: UpstreamAuth,
        ctx: &CallContext,
    ) -> Result<ProviderResult, AppError> {
        let payload = serde_json::to_value(body).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!(
                "Failed to encode {} payload: {}",
                operation,
                e
            ))
        })?;
        let value = self.provider.call(operation, payload, auth, ctx).await?;
        ProviderResult::read(operation, value)
    }

    async fn send_for_message<B: Serialize>(
        &self,
        operation: Operation,
        body: &B,
        auth: UpstreamAuth,
        ctx: &CallContext,
    ) -> Result<MessageResponse, AppError> {
        let message = self
            .send(operation, body, auth, ctx)
            .await?
            .into_message(operation)?;
        tracing::info!(operation = %operation, "Operation completed");
        Ok(MessageResponse { message })
    }
}

fn require(session: Option<&AuthenticatedSession>) -> Result<&AuthenticatedSession, AppError> {
    session.ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("missing session")))
}

fn decode<T: DeserializeOwned>(operation: Operation, value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!(
            "Unexpected {} result from identity provider: {}",
            operation,
            e
        ))
    })
}

fn message_of(operation: Operation, value: &Value) -> String {
    MessageResult::deserialize(value)
        .unwrap_or_default()
        .message
        .unwrap_or_else(|| default_message(operation).to_string())
}

/// A challenge instead of tokens means the flow cannot complete here.
fn authentication_result(
    operation: Operation,
    value: Value,
) -> Result<upstream::AuthenticationResult, AppError> {
    let result: InitiateAuthResult = decode(operation, value)?;
    match result.authentication_result {
        Some(tokens) => Ok(tokens),
        None => Err(AppError::UpstreamRejected {
            code: ErrorCode::AuthenticationFailed,
            provider_code: result
                .challenge_name
                .unwrap_or_else(|| "MissingAuthenticationResult".to_string()),
        }),
    }
}
