use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationErrors};

use super::Operation;
use crate::dtos::auth::{
    ChangePasswordRequest, ConfirmForgotPasswordRequest, ConfirmSignUpRequest,
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    ResendConfirmationCodeRequest, SignUpRequest, SignUpResponse, TokenRefreshRequest,
    TokenRefreshResponse, UpdateUserAttributesRequest,
};
use crate::services::credentials::Claims;

/// Any of the nine operations, as accepted by `POST /auth/operations`:
/// `{"operation": "login", "payload": {...}}`.
#[derive(Clone, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "snake_case")]
pub enum AuthRequest {
    Login(LoginRequest),
    SignUp(SignUpRequest),
    ConfirmSignUp(ConfirmSignUpRequest),
    ResendConfirmationCode(ResendConfirmationCodeRequest),
    RefreshToken(TokenRefreshRequest),
    ChangePassword(ChangePasswordRequest),
    ForgotPassword(ForgotPasswordRequest),
    ConfirmForgotPassword(ConfirmForgotPasswordRequest),
    UpdateUserAttributes(UpdateUserAttributesRequest),
}

impl AuthRequest {
    pub fn operation(&self) -> Operation {
        match self {
            AuthRequest::Login(_) => Operation::Login,
            AuthRequest::SignUp(_) => Operation::SignUp,
            AuthRequest::ConfirmSignUp(_) => Operation::ConfirmSignUp,
            AuthRequest::ResendConfirmationCode(_) => Operation::ResendConfirmationCode,
            AuthRequest::RefreshToken(_) => Operation::RefreshToken,
            AuthRequest::ChangePassword(_) => Operation::ChangePassword,
            AuthRequest::ForgotPassword(_) => Operation::ForgotPassword,
            AuthRequest::ConfirmForgotPassword(_) => Operation::ConfirmForgotPassword,
            AuthRequest::UpdateUserAttributes(_) => Operation::UpdateUserAttributes,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            AuthRequest::Login(req) => req.validate(),
            AuthRequest::SignUp(req) => req.validate(),
            AuthRequest::ConfirmSignUp(req) => req.validate(),
            AuthRequest::ResendConfirmationCode(req) => req.validate(),
            AuthRequest::RefreshToken(req) => req.validate(),
            AuthRequest::ChangePassword(req) => req.validate(),
            AuthRequest::ForgotPassword(req) => req.validate(),
            AuthRequest::ConfirmForgotPassword(req) => req.validate(),
            AuthRequest::UpdateUserAttributes(req) => req.validate(),
        }
    }
}

/// Per-operation result: `{"operation": "login", "result": {...}}`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "operation", content = "result", rename_all = "snake_case")]
pub enum AuthResponse {
    Login(LoginResponse),
    SignUp(SignUpResponse),
    ConfirmSignUp(MessageResponse),
    ResendConfirmationCode(MessageResponse),
    RefreshToken(TokenRefreshResponse),
    ChangePassword(MessageResponse),
    ForgotPassword(MessageResponse),
    ConfirmForgotPassword(MessageResponse),
    UpdateUserAttributes(MessageResponse),
}

impl AuthResponse {
    pub fn operation(&self) -> Operation {
        match self {
            AuthResponse::Login(_) => Operation::Login,
            AuthResponse::SignUp(_) => Operation::SignUp,
            AuthResponse::ConfirmSignUp(_) => Operation::ConfirmSignUp,
            AuthResponse::ResendConfirmationCode(_) => Operation::ResendConfirmationCode,
            AuthResponse::RefreshToken(_) => Operation::RefreshToken,
            AuthResponse::ChangePassword(_) => Operation::ChangePassword,
            AuthResponse::ForgotPassword(_) => Operation::ForgotPassword,
            AuthResponse::ConfirmForgotPassword(_) => Operation::ConfirmForgotPassword,
            AuthResponse::UpdateUserAttributes(_) => Operation::UpdateUserAttributes,
        }
    }
}

/// Caller-owned bearer token. Attached to a single upstream call and never
/// stored.
#[derive(Clone)]
pub struct SessionToken(Secret<String>);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// A session token that passed credential validation, with its claims.
///
/// Only the credential validator constructs these, so holding one proves
/// the check ran.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    token: SessionToken,
    claims: Claims,
}

impl AuthenticatedSession {
    pub(crate) fn new(token: SessionToken, claims: Claims) -> Self {
        Self { token, claims }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}
