//! JSON session endpoints.

#![allow(clippy::unwrap_used)]

use open_impact_integration_tests::TestApp;
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_session_endpoint_reports_anonymous() {
    let app = TestApp::spawn().await;

    let resp = app.get("/api/session").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "identity": null, "isLoading": false, "isAuthenticated": false })
    );
}

#[tokio::test]
async fn test_session_endpoint_reports_identity() {
    let app = TestApp::spawn().await;
    app.sign_up_organization("nonprofit", "grace@acme.example")
        .await;

    let body: Value = app.get("/api/session").await.json().await.unwrap();
    assert_eq!(body["isAuthenticated"], true);
    assert_eq!(body["isLoading"], false);
    assert_eq!(body["identity"]["email"], "grace@acme.example");
    assert_eq!(body["identity"]["accountType"], "nonprofit");
}

#[tokio::test]
async fn test_me_rejects_anonymous_with_json() {
    let app = TestApp::spawn().await;

    let resp = app.get("/api/me").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "unauthenticated" }));
}

#[tokio::test]
async fn test_me_returns_identity() {
    let app = TestApp::spawn().await;
    app.sign_up_individual("Ada Lovelace", "ada@example.org").await;

    let resp = app.get("/api/me").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Ada Lovelace");
    assert_eq!(body["accountType"], "individual");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/session"))
        .header("x-request-id", "edge-1234")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "edge-1234");

    let resp = app.get("/health").await;
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_access_endpoint_evaluates_account_type() {
    let app = TestApp::spawn().await;

    let body: Value = app.get("/api/access?types=company").await.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "loading": false, "authenticated": false, "identity": null, "hasAccess": false })
    );

    app.sign_up_organization("nonprofit", "grace@acme.example")
        .await;

    let body: Value = app.get("/api/access?types=company").await.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["hasAccess"], false);
    assert_eq!(body["identity"]["accountType"], "nonprofit");

    let body: Value = app
        .get("/api/access?types=company,nonprofit")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["hasAccess"], true);

    let body: Value = app.get("/api/access").await.json().await.unwrap();
    assert_eq!(body["hasAccess"], true);
}

#[tokio::test]
async fn test_access_endpoint_rejects_unknown_type() {
    let app = TestApp::spawn().await;

    let resp = app.get("/api/access?types=company,admin").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
