//! Email endpoints outside production only log the message.

use axum::http::StatusCode;
use neyisek_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_restaurant_application_is_simulated() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/email/restaurant-application",
            &json!({
                "restaurantName": "Adana Sofrası",
                "ownerName": "Mehmet Yılmaz",
                "email": "mehmet@example.com",
                "phone": "+90 532 000 00 01",
                "cuisineType": "Kebap"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["simulated"], true);
}

#[tokio::test]
async fn test_restaurant_application_missing_field() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/email/restaurant-application",
            &json!({ "restaurantName": "Adana Sofrası", "email": "mehmet@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Eksik alan: ownerName");
}

#[tokio::test]
async fn test_financial_report() {
    let app = TestApp::new();
    let report = json!({
        "restaurantName": "Adana Sofrası",
        "email": "muhasebe@example.com",
        "period": "Ekim 2026",
        "totalOrders": 412,
        "totalRevenue": 98450.5,
        "commission": 9845.05,
        "netAmount": 88605.45
    });

    let (status, body) = app.post("/api/email/financial-report", &report).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["simulated"], true);

    let mut bad = report;
    bad["email"] = json!("muhasebe");
    let (status, body) = app.post("/api/email/financial-report", &bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Geçersiz e-posta adresi");
}
