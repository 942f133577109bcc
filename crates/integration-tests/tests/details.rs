//! Vehicle details and deletion.

use axum::http::Method;
use reqwest::StatusCode;

use vehicle_manager_integration_tests::{TestContext, location};

#[tokio::test]
async fn test_details_show_every_field() {
    let ctx = TestContext::signed_in().await;

    let body = ctx.page("/vehicles/details?id=3").await;

    // Seed vehicle 3: white Kia Sportage SUV, electric, registered 2018
    assert!(body.contains("<h1>VRM3</h1>"));
    assert!(body.contains("Kia Sportage"));
    for label in [
        "Manufacturer",
        "Model",
        "Type",
        "Fuel",
        "Colour",
        "Mileage",
        "Price",
        "Registration date",
        "VIN",
    ] {
        assert!(body.contains(&format!("<dt>{label}</dt>")), "missing {label}");
    }
    assert!(body.contains("Electric"));
    assert!(body.contains("White"));
    assert!(body.contains("3,000"));
    assert!(body.contains("£13,000"));
    assert!(body.contains("1 January 2018"));
    assert!(body.contains("VIN00000000000003"));
    // Breadcrumb
    assert!(body.contains(r#"<a href="/vehicles">Vehicles</a>"#));
}

#[tokio::test]
async fn test_missing_id_is_not_found_without_fetching() {
    let ctx = TestContext::signed_in().await;

    let resp = ctx.get("/vehicles/details").await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.text().await.expect("body").contains("404: Not found"));
    let fetched = ctx.api.store().await.requests.iter().any(|r| r.path.starts_with("/vehicles/"));
    assert!(!fetched);
}

#[tokio::test]
async fn test_unknown_id_reports_not_found() {
    let ctx = TestContext::signed_in().await;

    let resp = ctx.get("/vehicles/details?id=999").await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Something went wrong!"));
    assert!(body.contains("Request failed with status code 404 Not Found"));
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let ctx = TestContext::signed_in().await;

    let body = ctx.page("/vehicles/details?id=3").await;
    assert!(!body.contains("Are you sure you want to delete this vehicle?"));
    assert!(body.contains(r#"href="/vehicles/details?id=3&#38;delete=confirm""#));

    let body = ctx.page("/vehicles/details?id=3&delete=confirm").await;
    assert!(body.contains("Are you sure you want to delete this vehicle?"));
    assert!(body.contains(
        "This action cannot be undone. This will permanently delete the vehicle from your stock inventory."
    ));
    assert!(body.contains(r#"action="/vehicles/delete""#));

    // Viewing the dialog deletes nothing
    assert_eq!(ctx.api.count(&Method::DELETE, "/vehicles/3").await, 0);
}

#[tokio::test]
async fn test_confirmed_delete_lands_on_dashboard() {
    let ctx = TestContext::signed_in().await;

    let resp = ctx.post_form("/vehicles/delete", &[("id", "3")]).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/"));
    assert_eq!(ctx.api.count(&Method::DELETE, "/vehicles/3").await, 1);
    assert!(ctx.api.store().await.vehicles.iter().all(|v| v.id.as_str() != "3"));

    // The notice shows once
    let body = ctx.page("/").await;
    assert!(body.contains("Vehicle successfully deleted"));
    let body = ctx.page("/").await;
    assert!(!body.contains("Vehicle successfully deleted"));
}

#[tokio::test]
async fn test_failed_delete_keeps_dialog_open() {
    let ctx = TestContext::signed_in().await;
    ctx.api
        .fail(Method::DELETE, "/vehicles/3", axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        .await;

    let resp = ctx.post_form("/vehicles/delete", &[("id", "3")]).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Are you sure you want to delete this vehicle?"));
    assert!(body.contains("Oops!"));
    assert!(body.contains("Request failed with status code 500"));
    assert_eq!(ctx.api.store().await.vehicles.len(), 25);
}
