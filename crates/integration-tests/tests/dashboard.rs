//! Dashboard statistics and charts.

use axum::http::Method;
use reqwest::StatusCode;

use vehicle_manager_integration_tests::TestContext;

#[tokio::test]
async fn test_dashboard_shows_statistics() {
    let ctx = TestContext::signed_in().await;

    let body = ctx.page("/").await;

    assert!(body.contains("Vehicle Manager"));
    assert!(body.contains("Vehicles in stock"));
    assert!(body.contains("Unique OEMs"));
    assert!(body.contains("Stock value"));
    // 25 seeded vehicles priced 11,000 to 35,000
    assert!(body.contains("£575K"));
}

#[tokio::test]
async fn test_dashboard_shows_charts() {
    let ctx = TestContext::signed_in().await;

    let body = ctx.page("/").await;

    assert!(body.contains("Top 5 OEMs"));
    assert!(body.contains("Fuel Type Breakdown"));
    assert!(body.contains("Registrations By Year"));
    assert!(body.contains("Petrol"));
    assert!(body.contains("Tesla"));
    assert!(body.contains("2022"));
}

#[tokio::test]
async fn test_dashboard_requests_every_chart() {
    let ctx = TestContext::signed_in().await;

    ctx.page("/").await;

    let charts = ctx.api.requests_to(&Method::GET, "/chart").await;
    let mut kinds: Vec<String> = charts.into_iter().filter_map(|r| r.query).collect();
    kinds.sort();
    assert_eq!(
        kinds,
        vec!["type=FUEL_TYPE", "type=OEM", "type=REGISTRATION_YEAR"]
    );
    assert_eq!(ctx.api.count(&Method::GET, "/summary").await, 1);
}

#[tokio::test]
async fn test_dashboard_marks_home_active() {
    let ctx = TestContext::signed_in().await;

    let body = ctx.page("/").await;

    assert!(body.contains(r#"class="active" aria-current="page">Home</a>"#));
}

#[tokio::test]
async fn test_dashboard_error_offers_retry() {
    let ctx = TestContext::signed_in().await;
    ctx.api
        .fail(Method::GET, "/chart", axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        .await;

    let resp = ctx.get("/").await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Something went wrong!"));
    assert!(body.contains("Request failed with status code 500"));
    assert!(body.contains("Try Again"));

    // Errors are not cached, so a retry reaches the API again
    ctx.api.clear_failures().await;
    let body = ctx.page("/").await;
    assert!(body.contains("Vehicles in stock"));
}

#[tokio::test]
async fn test_health_and_not_found() {
    let ctx = TestContext::new().await;

    let resp = ctx.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = ctx.get("/no/such/page").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = resp.text().await.expect("body");
    assert!(body.contains("404: Not found"));
    assert!(body.contains(r#"href="/""#));
}

#[tokio::test]
async fn test_security_headers() {
    let ctx = TestContext::new().await;

    let resp = ctx.get("/health").await;

    assert_eq!(
        resp.headers().get("x-frame-options").and_then(|v| v.to_str().ok()),
        Some("DENY")
    );
    assert_eq!(
        resp.headers()
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}

#[tokio::test]
async fn test_stylesheet_is_served() {
    let ctx = TestContext::new().await;

    let resp = ctx.get("/static/main.css").await;

    assert_eq!(resp.status(), StatusCode::OK);
}
