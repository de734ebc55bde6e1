//! Order placement, listing and status changes through the HTTP API.

use axum::http::StatusCode;
use neyisek_integration_tests::{TestApp, order_body};
use serde_json::{Value, json};

#[tokio::test]
async fn test_order_lifecycle() {
    let app = TestApp::new();
    let order_id = app.place_order("user-1", "r-1").await;

    let (status, body) = app.get(&format!("/api/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["restaurantId"], "r-1");
    assert_eq!(body["order"]["customerInfo"]["name"], "Zeynep Kaya");

    let (status, body) = app
        .patch(
            &format!("/api/orders/{order_id}/status"),
            &json!({ "status": "confirmed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "confirmed");

    for next in ["preparing", "ready", "delivering", "delivered"] {
        let (status, _) = app
            .patch(
                &format!("/api/orders/{order_id}/status"),
                &json!({ "status": next }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "transition to {next}");
    }

    // Delivered is terminal
    let (status, body) = app
        .patch(
            &format!("/api/orders/{order_id}/status"),
            &json!({ "status": "cancelled" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_list_by_scope() {
    let app = TestApp::new();
    app.place_order("user-1", "r-1").await;
    app.place_order("user-1", "r-2").await;
    app.place_order("user-2", "r-1").await;

    let count = |body: &Value| body["orders"].as_array().map_or(0, Vec::len);

    let (status, body) = app.get("/api/orders?userId=user-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count(&body), 2);

    let (_, body) = app.get("/api/orders?restaurantId=r-1").await;
    assert_eq!(count(&body), 2);

    let (_, body) = app.get("/api/orders?scope=admin").await;
    assert_eq!(count(&body), 3);

    // userId wins over restaurantId
    let (_, body) = app.get("/api/orders?userId=user-2&restaurantId=r-2").await;
    assert_eq!(count(&body), 1);
}

#[tokio::test]
async fn test_list_without_scope_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/orders").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId veya restaurantId gereklidir");
}

#[tokio::test]
async fn test_newest_orders_first() {
    let app = TestApp::new();
    let first = app.place_order("user-1", "r-1").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.place_order("user-1", "r-1").await;

    let (_, body) = app.get("/api/orders?userId=user-1").await;
    assert_eq!(body["orders"][0]["id"], second.as_str());
    assert_eq!(body["orders"][1]["id"], first.as_str());
}

#[tokio::test]
async fn test_validation_messages() {
    let app = TestApp::new();
    let cases = [
        ("restaurantId", json!(null), "Restoran bilgisi eksik"),
        ("items", json!([]), "Sipariş en az bir ürün içermelidir"),
        ("customerInfo", json!(null), "Müşteri bilgileri eksik"),
        ("customerInfo", json!({ "phone": "555" }), "Müşteri adı gerekli"),
        ("customerInfo", json!({ "name": "Zeynep" }), "Telefon numarası gerekli"),
        ("totalAmount", json!(0), "Geçersiz sipariş tutarı"),
        ("deliveryFee", json!(-5), "Geçersiz teslimat ücreti"),
    ];

    for (field, value, message) in cases {
        let mut body = order_body("user-1", "r-1");
        body[field] = value;
        let (status, response) = app.post("/api/orders", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field}");
        assert_eq!(response["success"], false);
        assert_eq!(response["error"], message, "{field}");
    }
}

#[tokio::test]
async fn test_zero_quantity_is_rejected() {
    let app = TestApp::new();
    let mut body = order_body("user-1", "r-1");
    body["items"][0]["quantity"] = json!(0);
    let (status, response) = app.post("/api/orders", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Geçersiz ürün adedi");
}

#[tokio::test]
async fn test_item_price_is_checked() {
    let app = TestApp::new();
    let cases = [(json!(-500), 1), (json!(1e28), 100)];

    for (price, quantity) in cases {
        let mut body = order_body("user-1", "r-1");
        body["items"][0]["price"] = price.clone();
        body["items"][0]["quantity"] = json!(quantity);
        let (status, response) = app.post("/api/orders", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{price}");
        assert_eq!(response["error"], "Geçersiz ürün fiyatı", "{price}");
    }

    // Nothing was stored
    let (status, body) = app.get("/api/orders?userId=user-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orders"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_malformed_body_uses_error_shape() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/orders", &json!("not an object")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Geçersiz istek gövdesi");
}

#[tokio::test]
async fn test_unknown_order() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/orders/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Sipariş bulunamadı");

    let (status, _) = app
        .patch("/api/orders/missing/status", &json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_status_value() {
    let app = TestApp::new();
    let order_id = app.place_order("user-1", "r-1").await;

    let (status, body) = app
        .patch(
            &format!("/api/orders/{order_id}/status"),
            &json!({ "status": "teleported" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Geçersiz sipariş durumu");
}
