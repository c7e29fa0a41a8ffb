//! Identity provider wire types (Cognito JSON protocol, PascalCase fields).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const USER_PASSWORD_AUTH: &str = "USER_PASSWORD_AUTH";
pub const REFRESH_TOKEN_AUTH: &str = "REFRESH_TOKEN_AUTH";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuth {
    pub auth_flow: &'static str,
    pub client_id: String,
    pub auth_parameters: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeType {
    pub name: String,
    pub value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignUp {
    pub client_id: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,
    pub user_attributes: Vec<AttributeType>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfirmSignUp {
    pub client_id: String,
    pub username: String,
    pub confirmation_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,
}

/// Body of ResendConfirmationCode and ForgotPassword.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UsernameOnly {
    pub client_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfirmForgotPassword {
    pub client_id: String,
    pub username: String,
    pub confirmation_code: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangePassword {
    pub access_token: String,
    pub previous_password: String,
    pub proposed_password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateUserAttributes {
    pub access_token: String,
    pub user_attributes: Vec<AttributeType>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthResult {
    pub authentication_result: Option<AuthenticationResult>,
    pub challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignUpResult {
    #[serde(default)]
    pub user_confirmed: bool,
    pub user_sub: Option<String>,
}

/// Status text some provider deployments attach to message-only results.
#[derive(Deserialize, Default)]
pub struct MessageResult {
    pub message: Option<String>,
}

/// `{"__type": "NotAuthorizedException", "message": "..."}`
#[derive(Debug, Deserialize)]
pub struct ProviderError {
    #[serde(rename = "__type")]
    pub error_type: Option<String>,
    #[serde(alias = "Message")]
    pub message: Option<String>,
}

impl ProviderError {
    /// Exception name without the namespace prefix some endpoints add
    /// (`com.amazonaws...#UserNotFoundException`).
    pub fn exception_name(&self) -> Option<&str> {
        self.error_type
            .as_deref()
            .map(|t| t.rsplit('#').next().unwrap_or(t))
    }
}
