//! Sign-up, sign-in, sign-out and profile updates.

#![allow(clippy::unwrap_used)]

use open_impact_core::{AccountType, Email};
use open_impact_integration_tests::{TestApp, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_sign_up_establishes_session_and_tags_account_type() {
    let app = TestApp::spawn().await;

    let resp = app
        .sign_up_organization("company", "grace@acme.example")
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/company-dashboard");

    let stored = app
        .provider
        .get(&Email::parse("grace@acme.example").unwrap())
        .await
        .unwrap();
    assert_eq!(stored.account_type, AccountType::Company);
    assert_eq!(stored.name, "Grace Hopper");
    assert_eq!(stored.organization.unwrap().name, "Acme Renewables");
}

#[tokio::test]
async fn test_invalid_sign_up_renders_errors_inline() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_form(
            "/auth/sign-up",
            &[
                ("name", ""),
                ("email", "not-an-email"),
                ("password", "short"),
                ("password_confirm", "different"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Enter your name"));
    assert!(app.provider.is_empty().await);
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.sign_up_individual("Ada Lovelace", "ada@example.org").await;
    app.sign_out().await;

    let resp = app
        .sign_up_individual("Ada Again", "ADA@example.org")
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(
        resp.text()
            .await
            .unwrap()
            .contains("An account with this email already exists")
    );
    assert_eq!(app.provider.len().await, 1);
}

#[tokio::test]
async fn test_sign_in_returns_to_requested_page() {
    let app = TestApp::spawn().await;
    app.sign_up_individual("Ada Lovelace", "ada@example.org").await;
    app.sign_out().await;

    let resp = app.sign_in("ada@example.org", Some("/account")).await;
    assert_eq!(location(&resp), "/account");
    assert_eq!(app.get("/account").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_redirects_with_error_code() {
    let app = TestApp::spawn().await;
    app.sign_up_individual("Ada Lovelace", "ada@example.org").await;
    app.sign_out().await;

    let resp = app
        .post_form(
            "/auth/sign-in",
            &[("email", "ada@example.org"), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(location(&resp), "/auth?error=credentials");

    // Still anonymous.
    let resp = app.get("/dashboard").await;
    assert_eq!(location(&resp), "/auth?redirect=%2Fdashboard");

    let page = app.get("/auth?error=credentials").await.text().await.unwrap();
    assert!(page.contains("Invalid email or password"));
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let app = TestApp::spawn().await;
    app.sign_up_individual("Ada Lovelace", "ada@example.org").await;
    assert_eq!(app.get("/dashboard").await.status(), StatusCode::OK);

    let resp = app.sign_out().await;
    assert_eq!(location(&resp), "/");

    let resp = app.get("/dashboard").await;
    assert_eq!(location(&resp), "/auth?redirect=%2Fdashboard");

    // Signing out twice is harmless.
    assert_eq!(location(&app.sign_out().await), "/");
}

#[tokio::test]
async fn test_profile_update_persists() {
    let app = TestApp::spawn().await;
    app.sign_up_organization("company", "grace@acme.example")
        .await;

    let resp = app
        .post_form(
            "/account",
            &[
                ("name", "Rear Admiral Hopper"),
                ("contactTitle", "Chief Sustainability Officer"),
            ],
        )
        .await;
    assert_eq!(location(&resp), "/account?saved=1");

    let page = app.get("/account?saved=1").await.text().await.unwrap();
    assert!(page.contains("Profile saved."));
    assert!(page.contains("Rear Admiral Hopper"));

    let stored = app
        .provider
        .get(&Email::parse("grace@acme.example").unwrap())
        .await
        .unwrap();
    assert_eq!(stored.name, "Rear Admiral Hopper");
    assert_eq!(
        stored.organization.unwrap().contact_title.as_deref(),
        Some("Chief Sustainability Officer")
    );

    // The session copy survives a fresh sign-in.
    app.sign_out().await;
    app.sign_in("grace@acme.example", None).await;
    let page = app.get("/account").await.text().await.unwrap();
    assert!(page.contains("Rear Admiral Hopper"));
}

#[tokio::test]
async fn test_script_links_are_rejected_and_never_rendered() {
    let app = TestApp::spawn().await;
    app.sign_up_organization("company", "grace@acme.example")
        .await;

    let resp = app
        .post_form("/account", &[("website", "javascript:alert(document.domain)")])
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = resp.text().await.unwrap();
    assert!(page.contains("Enter a valid web address (http or https)"));
    assert!(!page.contains("javascript:"));

    let resp = app
        .post_form(
            "/account",
            &[("name", "Mallory"), ("image", "javascript:alert(1)")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored = app
        .provider
        .get(&Email::parse("grace@acme.example").unwrap())
        .await
        .unwrap();
    assert_eq!(stored.name, "Grace Hopper");
    assert_eq!(stored.image, None);
    assert_eq!(
        stored.organization.unwrap().website.as_deref(),
        Some("https://acme.example")
    );

    let profile = app.get("/company-profile").await.text().await.unwrap();
    assert!(!profile.contains("javascript:"));
    assert!(profile.contains("acme.example"));
}
