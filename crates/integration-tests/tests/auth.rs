//! Sign-in, sign-out, and the auth gate.

use axum::http::Method;
use reqwest::StatusCode;

use vehicle_manager_integration_tests::{EMAIL, PASSWORD, TestContext, location};

#[tokio::test]
async fn test_private_page_redirects_to_login() {
    let ctx = TestContext::new().await;

    let resp = ctx.get("/vehicles?page=2&q=ford").await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&resp),
        Some("/login?to=%2Fvehicles%3Fpage%3D2%26q%3Dford")
    );
    assert_eq!(ctx.api.count(&Method::GET, "/vehicles").await, 0);
}

#[tokio::test]
async fn test_details_page_returns_after_login() {
    let ctx = TestContext::new().await;

    let resp = ctx.get("/vehicles/details?id=3").await;
    assert_eq!(location(&resp), Some("/login?to=%2Fvehicles%2Fdetails%3Fid%3D3"));

    let resp = ctx
        .post_form(
            "/login",
            &[("email", EMAIL), ("password", PASSWORD), ("to", "/vehicles/details?id=3")],
        )
        .await;
    assert_eq!(location(&resp), Some("/vehicles/details?id=3"));
    assert!(ctx.page("/vehicles/details?id=3").await.contains("VRM3"));
}

#[tokio::test]
async fn test_htmx_request_gets_hx_redirect() {
    let ctx = TestContext::new().await;

    let resp = ctx.get_htmx("/vehicles/results?page=1&q=").await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let target = resp
        .headers()
        .get("HX-Redirect")
        .and_then(|v| v.to_str().ok())
        .expect("HX-Redirect header");
    assert_eq!(target, "/login?to=%2Fvehicles%2Fresults%3Fpage%3D1%26q%3D");
}

#[tokio::test]
async fn test_login_page_renders() {
    let ctx = TestContext::new().await;

    let body = ctx.page("/login?to=%2Fadd").await;

    assert!(body.contains("Login"));
    assert!(body.contains("Enter your email below to login to your account."));
    assert!(body.contains("Sign in"));
    assert!(body.contains(r#"name="to""#));
}

#[tokio::test]
async fn test_login_returns_to_requested_page() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .post_form(
            "/login",
            &[("email", EMAIL), ("password", PASSWORD), ("to", "/vehicles?page=2")],
        )
        .await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/vehicles?page=2"));
    assert_eq!(ctx.get("/").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_ignores_external_return_target() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .post_form(
            "/login",
            &[("email", EMAIL), ("password", PASSWORD), ("to", "//evil.example")],
        )
        .await;

    assert_eq!(location(&resp), Some("/"));
}

#[tokio::test]
async fn test_bad_credentials_show_error() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .post_form("/login", &[("email", EMAIL), ("password", "wrong"), ("to", "/")])
        .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Oops!"));
    assert!(body.contains("Request failed with status code 401 Unauthorized: POST"));
    // Entered email is kept
    assert!(body.contains(EMAIL));

    assert_eq!(ctx.get("/").await.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_signed_in_user_skips_login_page() {
    let ctx = TestContext::signed_in().await;

    let resp = ctx.get("/login?to=%2Fvehicles").await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/vehicles"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let ctx = TestContext::signed_in().await;
    assert_eq!(ctx.get("/").await.status(), StatusCode::OK);

    let resp = ctx.post_form("/logout", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/login"));

    assert_eq!(ctx.get("/").await.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_current_user_fetched_once_per_session() {
    let ctx = TestContext::signed_in().await;

    ctx.page("/").await;
    ctx.page("/vehicles").await;
    ctx.page("/add").await;

    assert_eq!(ctx.api.count(&Method::GET, "/me").await, 1);
}

#[tokio::test]
async fn test_user_menu_shows_current_user() {
    let ctx = TestContext::signed_in().await;

    let body = ctx.page("/").await;

    assert!(body.contains("Jane Doe"));
    assert!(body.contains(EMAIL));
    assert!(body.contains("Log out"));
}

#[tokio::test]
async fn test_user_menu_hidden_when_user_fails() {
    let ctx = TestContext::signed_in().await;
    ctx.api
        .fail(Method::GET, "/me", axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        .await;

    let body = ctx.page("/").await;

    assert!(!body.contains("Log out"));
    assert!(body.contains("Vehicles in stock"));
}
