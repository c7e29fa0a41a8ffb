//! Request and response bodies of the nine authentication operations.
//!
//! Types carrying passwords, codes or tokens deliberately do not implement
//! `Debug`; payloads reach the logs only through `Redacted`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::credentials::Claims;

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    #[schema(example = "Secret123", min_length = 6, max_length = 128)]
    pub password: String,
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    #[schema(example = "Secret123", min_length = 6, max_length = 128)]
    pub password: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,

    #[validate(length(max = 15, message = "Phone number must be at most 15 characters"))]
    #[schema(example = "+15555550100")]
    pub phone_number: Option<String>,

    #[validate(length(max = 50, message = "Given name must be at most 50 characters"))]
    #[schema(example = "Alice")]
    pub given_name: Option<String>,

    #[validate(length(max = 50, message = "Family name must be at most 50 characters"))]
    #[schema(example = "Liddell")]
    pub family_name: Option<String>,
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct ConfirmSignUpRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 6, max = 10, message = "Confirmation code must be 6-10 characters"))]
    #[schema(example = "123456")]
    pub confirmation_code: String,
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct ResendConfirmationCodeRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    #[schema(example = "alice")]
    pub username: String,
}

#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
pub struct TokenRefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Refresh token is required"))]
    #[schema(example = "eyJjdHkiOiJKV1QiLCJlbmMiOi...")]
    pub refresh_token: String,
}

/// The access token is taken from the `Authorization` header.
#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 6, max = 128, message = "Previous password must be 6-128 characters"))]
    #[schema(example = "Secret123")]
    pub previous_password: String,

    #[validate(length(min = 6, max = 128, message = "Proposed password must be 6-128 characters"))]
    #[schema(example = "Secret456")]
    pub proposed_password: String,
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    #[schema(example = "alice")]
    pub username: String,
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct ConfirmForgotPasswordRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    #[schema(example = "alice")]
    pub username: String,

    #[validate(length(min = 6, max = 10, message = "Confirmation code must be 6-10 characters"))]
    #[schema(example = "123456")]
    pub confirmation_code: String,

    #[validate(length(min = 6, max = 128, message = "New password must be 6-128 characters"))]
    #[schema(example = "NewPass1")]
    pub new_password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UserAttribute {
    #[validate(length(min = 1, max = 32, message = "Attribute name must be 1-32 characters"))]
    #[schema(example = "given_name")]
    pub name: String,

    #[validate(length(max = 2048, message = "Attribute value must be at most 2048 characters"))]
    #[schema(example = "Alice")]
    pub value: String,
}

/// The access token is taken from the `Authorization` header.
#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUserAttributesRequest {
    #[validate(
        length(min = 1, message = "At least one attribute is required"),
        nested
    )]
    pub attributes: Vec<UserAttribute>,
}

#[derive(Deserialize, ToSchema)]
pub struct IntrospectRequest {
    #[schema(example = "eyJraWQiOiJ...")]
    pub token: String,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignUpResponse {
    #[schema(example = "User signed up successfully")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "8f4e2a1c-0b7d-4c55-9a0e-3f1d2b6c7e90")]
    pub user_sub: Option<String>,
}

/// Result of the message-only operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Password reset successfully")]
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IntrospectResponse {
    #[schema(example = true)]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "expired")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
}
