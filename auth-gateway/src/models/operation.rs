use serde::{Deserialize, Serialize};
use std::fmt;

/// The nine operations the gateway forwards to the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Login,
    SignUp,
    ConfirmSignUp,
    ResendConfirmationCode,
    RefreshToken,
    ChangePassword,
    ForgotPassword,
    ConfirmForgotPassword,
    UpdateUserAttributes,
}

/// How the outbound call authenticates to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Basic <client-credentials>`
    Basic,
    /// `Bearer <access_token>` of the calling user
    Bearer,
}

/// What a successful provider response is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Access, id and refresh tokens.
    Tokens,
    /// Access and id tokens; the refresh token is not rotated.
    RefreshedTokens,
    /// Status message plus the new user's subject.
    SignUp,
    /// Status message only.
    Message,
}

/// Fixed association between an operation and how it is sent upstream.
#[derive(Debug, PartialEq, Eq)]
pub struct GatewayBinding {
    pub operation: Operation,
    pub scheme: AuthScheme,
    /// Appended to the configured provider endpoint.
    pub path: &'static str,
    /// Provider action, sent as `X-Amz-Target`.
    pub target: &'static str,
    pub shape: ResponseShape,
    /// Safe to send twice; only these calls are retried.
    pub replay_safe: bool,
}

static BINDINGS: [GatewayBinding; 9] = [
    GatewayBinding {
        operation: Operation::Login,
        scheme: AuthScheme::Basic,
        path: "/login",
        target: "AWSCognitoIdentityProviderService.InitiateAuth",
        shape: ResponseShape::Tokens,
        replay_safe: true,
    },
    GatewayBinding {
        operation: Operation::SignUp,
        scheme: AuthScheme::Basic,
        path: "/sign-up",
        target: "AWSCognitoIdentityProviderService.SignUp",
        shape: ResponseShape::SignUp,
        replay_safe: false,
    },
    GatewayBinding {
        operation: Operation::ConfirmSignUp,
        scheme: AuthScheme::Basic,
        path: "/confirm-sign-up",
        target: "AWSCognitoIdentityProviderService.ConfirmSignUp",
        shape: ResponseShape::Message,
        replay_safe: false,
    },
    GatewayBinding {
        operation: Operation::ResendConfirmationCode,
        scheme: AuthScheme::Basic,
        path: "/resend-confirmation-code",
        target: "AWSCognitoIdentityProviderService.ResendConfirmationCode",
        shape: ResponseShape::Message,
        replay_safe: false,
    },
    GatewayBinding {
        operation: Operation::RefreshToken,
        scheme: AuthScheme::Basic,
        path: "/refresh-token",
        target: "AWSCognitoIdentityProviderService.InitiateAuth",
        shape: ResponseShape::RefreshedTokens,
        replay_safe: true,
    },
    GatewayBinding {
        operation: Operation::ChangePassword,
        scheme: AuthScheme::Bearer,
        path: "/change-password",
        target: "AWSCognitoIdentityProviderService.ChangePassword",
        shape: ResponseShape::Message,
        replay_safe: false,
    },
    GatewayBinding {
        operation: Operation::ForgotPassword,
        scheme: AuthScheme::Basic,
        path: "/forgot-password",
        target: "AWSCognitoIdentityProviderService.ForgotPassword",
        shape: ResponseShape::Message,
        replay_safe: false,
    },
    GatewayBinding {
        operation: Operation::ConfirmForgotPassword,
        scheme: AuthScheme::Basic,
        path: "/confirm-forgot-password",
        target: "AWSCognitoIdentityProviderService.ConfirmForgotPassword",
        shape: ResponseShape::Message,
        replay_safe: false,
    },
    GatewayBinding {
        operation: Operation::UpdateUserAttributes,
        scheme: AuthScheme::Bearer,
        path: "/update-user-attributes",
        target: "AWSCognitoIdentityProviderService.UpdateUserAttributes",
        shape: ResponseShape::Message,
        replay_safe: false,
    },
];

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::Login,
        Operation::SignUp,
        Operation::ConfirmSignUp,
        Operation::ResendConfirmationCode,
        Operation::RefreshToken,
        Operation::ChangePassword,
        Operation::ForgotPassword,
        Operation::ConfirmForgotPassword,
        Operation::UpdateUserAttributes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::SignUp => "sign_up",
            Operation::ConfirmSignUp => "confirm_sign_up",
            Operation::ResendConfirmationCode => "resend_confirmation_code",
            Operation::RefreshToken => "refresh_token",
            Operation::ChangePassword => "change_password",
            Operation::ForgotPassword => "forgot_password",
            Operation::ConfirmForgotPassword => "confirm_forgot_password",
            Operation::UpdateUserAttributes => "update_user_attributes",
        }
    }

    pub fn binding(&self) -> &'static GatewayBinding {
        // BINDINGS is declared in the same order as the enum.
        &BINDINGS[*self as usize]
    }

    /// Whether the caller must present a validated session.
    pub fn requires_session(&self) -> bool {
        self.binding().scheme == AuthScheme::Bearer
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
