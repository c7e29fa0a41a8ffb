mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{expired_token, provider_error, valid_token, TestApp};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_confirm_forgot_password_surfaces_provider_message() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/confirm-forgot-password"))
        .and(header(
            "x-amz-target",
            "AWSCognitoIdentityProviderService.ConfirmForgotPassword",
        ))
        .and(body_partial_json(json!({
            "Username": "alice",
            "ConfirmationCode": "123456",
            "Password": "NewPass1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post(
            "/auth/confirm-forgot-password",
            json!({
                "username": "alice",
                "confirmation_code": "123456",
                "new_password": "NewPass1"
            }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "ok" }));
}

#[tokio::test]
async fn test_forgot_password_unknown_user() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/forgot-password"))
        .respond_with(provider_error("UserNotFoundException"))
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post("/auth/forgot-password", json!({ "username": "nobody" }), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "2002");
}

#[tokio::test]
async fn test_forgot_password_default_message() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/forgot-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "CodeDeliveryDetails": { "DeliveryMedium": "EMAIL", "Destination": "a***@e***" }
        })))
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post("/auth/forgot-password", json!({ "username": "alice" }), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password reset code sent successfully");
}

#[tokio::test]
async fn test_change_password_requires_bearer() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(
            "/auth/change-password",
            json!({ "previous_password": "OldPass1", "proposed_password": "NewPass1" }),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "2007");
    assert!(app.upstream_calls("/change-password").await.is_empty());
}

#[tokio::test]
async fn test_change_password_rejects_expired_session() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .post(
            "/auth/change-password",
            json!({ "previous_password": "OldPass1", "proposed_password": "NewPass1" }),
            Some(&expired_token()),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "2005");
    assert!(app.upstream_calls("/change-password").await.is_empty());
}

#[tokio::test]
async fn test_change_password_forwards_session_token() {
    let app = TestApp::spawn().await;
    let token = valid_token();
    Mock::given(method("POST"))
        .and(path("/change-password"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .and(body_partial_json(json!({
            "AccessToken": token,
            "PreviousPassword": "OldPass1",
            "ProposedPassword": "NewPass1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post(
            "/auth/change-password",
            json!({ "previous_password": "OldPass1", "proposed_password": "NewPass1" }),
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully");
}

#[tokio::test]
async fn test_change_password_wrong_previous_password() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/change-password"))
        .respond_with(provider_error("NotAuthorizedException"))
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post(
            "/auth/change-password",
            json!({ "previous_password": "WrongPass", "proposed_password": "NewPass1" }),
            Some(&valid_token()),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "2004");
    assert_eq!(app.upstream_calls("/change-password").await.len(), 1);
}

#[tokio::test]
async fn test_update_user_attributes() {
    let app = TestApp::spawn().await;
    let token = valid_token();
    Mock::given(method("POST"))
        .and(path("/update-user-attributes"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .and(body_partial_json(json!({
            "AccessToken": token,
            "UserAttributes": [{ "Name": "given_name", "Value": "Alicia" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post(
            "/auth/update-user-attributes",
            json!({ "attributes": [{ "name": "given_name", "value": "Alicia" }] }),
            Some(&token),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User attributes updated successfully");
}

#[tokio::test]
async fn test_update_user_attributes_revoked_token() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/update-user-attributes"))
        .respond_with(provider_error("NotAuthorizedException"))
        .mount(&app.upstream)
        .await;

    let (status, body) = app
        .post(
            "/auth/update-user-attributes",
            json!({ "attributes": [{ "name": "given_name", "value": "Alicia" }] }),
            Some(&valid_token()),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "2007");
}

#[tokio::test]
async fn test_lowercase_bearer_scheme_is_accepted() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/change-password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/auth/change-password")
        .header("content-type", "application/json")
        .header("authorization", format!("bearer {}", valid_token()))
        .body(Body::from(
            json!({ "previous_password": "OldPass1", "proposed_password": "NewPass1" })
                .to_string(),
        ))
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
}
