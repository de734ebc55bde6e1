//! Device tokens, push fan-out and the live notification stream.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use futures::StreamExt;
use neyisek_integration_tests::{RecordingMessenger, TestApp};
use serde_json::{Value, json};

async fn register(app: &TestApp, user_id: &str, token: &str) {
    let (status, body) = app
        .post(
            "/api/notifications/token",
            &json!({ "userId": user_id, "token": token, "platform": "web" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["tokenId"].is_string());
}

fn order_update(extra: &Value) -> Value {
    let mut body = json!({
        "type": "order_update",
        "data": { "orderId": "o-1", "status": "preparing", "restaurantName": "Adana Sofrası" }
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    body
}

#[tokio::test]
async fn test_send_to_user_devices() {
    let app = TestApp::new();
    register(&app, "user-1", "token-a").await;
    register(&app, "user-1", "token-b").await;
    register(&app, "user-2", "token-c").await;

    let (status, body) = app
        .post(
            "/api/notifications/send",
            &order_update(&json!({ "userId": "user-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["successCount"], 2);
    assert_eq!(body["failureCount"], 0);

    let sent = app.messenger.as_ref().map(|m| m.sent()).unwrap_or_default();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.data.get("orderId").map(String::as_str) == Some("o-1")));
    assert!(sent.iter().all(|m| m.data.get("type").map(String::as_str) == Some("order_update")));
}

#[tokio::test]
async fn test_failed_tokens_are_deactivated() {
    let app = TestApp::with_messenger(Some(RecordingMessenger::failing_for(&["stale"])));
    register(&app, "user-1", "fresh").await;
    register(&app, "user-1", "stale").await;

    let request = order_update(&json!({ "userId": "user-1" }));
    let (_, body) = app.post("/api/notifications/send", &request).await;
    assert_eq!(body["successCount"], 1);
    assert_eq!(body["failureCount"], 1);

    // The stale token is no longer targeted
    let (_, body) = app.post("/api/notifications/send", &request).await;
    assert_eq!(body["successCount"], 1);
    assert_eq!(body["failureCount"], 0);
}

#[tokio::test]
async fn test_restaurant_target_reaches_owner() {
    let app = TestApp::new();
    app.seed_catalog().await;
    register(&app, "owner-1", "owner-token").await;
    register(&app, "owner-2", "other-owner").await;

    let (status, body) = app
        .post(
            "/api/notifications/send",
            &json!({
                "type": "new_order",
                "restaurantId": "r-1",
                "data": { "orderId": "o-9", "customerName": "Zeynep", "totalAmount": 249.9 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["successCount"], 1);

    let sent = app.messenger.as_ref().map(|m| m.sent()).unwrap_or_default();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "owner-token");
}

#[tokio::test]
async fn test_segment_all_broadcasts() {
    let app = TestApp::new();
    register(&app, "user-1", "t1").await;
    register(&app, "user-2", "t2").await;

    let (_, body) = app
        .post(
            "/api/notifications/send",
            &json!({
                "type": "promotion",
                "segment": "all",
                "data": { "title": "Hafta sonu", "message": "Tüm kebaplarda %20", "promoCode": "KEBAP20" }
            }),
        )
        .await;
    assert_eq!(body["successCount"], 2);
}

#[tokio::test]
async fn test_no_devices_is_not_an_error() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/notifications/send",
            &order_update(&json!({ "userId": "nobody" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Hedef kullanıcı bulunamadı");
    assert_eq!(body["successCount"], 0);
}

#[tokio::test]
async fn test_send_rejects_bad_requests() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/api/notifications/send",
            &json!({ "type": "gossip", "userId": "user-1", "data": {} }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Geçersiz bildirim türü");

    let (status, body) = app
        .post(
            "/api/notifications/send",
            &json!({ "type": "order_update", "userId": "user-1", "data": { "status": "ready" } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Geçersiz bildirim verisi");

    let (status, body) = app.post("/api/notifications/send", &order_update(&json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId, restaurantId veya segment belirtilmelidir");
}

#[tokio::test]
async fn test_unconfigured_messaging_is_unavailable() {
    let app = TestApp::without_messaging();

    // Checked before the body is validated
    let (status, body) = app.post("/api/notifications/send", &json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Bildirim servisi yapılandırılmamış");

    // Even a body that is not JSON at all
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/notifications/send")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_malformed_send_body_when_configured() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/notifications/send", &json!("not an object"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Geçersiz istek gövdesi");
}

#[tokio::test]
async fn test_token_registration_and_removal() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/notifications/token", &json!({ "userId": "user-1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    register(&app, "user-1", "token-a").await;
    let (status, body) = app
        .delete("/api/notifications/token", &json!({ "token": "token-a" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deactivated"], true);

    let (_, body) = app
        .post(
            "/api/notifications/send",
            &order_update(&json!({ "userId": "user-1" })),
        )
        .await;
    assert_eq!(body["successCount"], 0);

    let (_, body) = app
        .delete("/api/notifications/token", &json!({ "token": "never-registered" }))
        .await;
    assert_eq!(body["deactivated"], false);
}

#[tokio::test]
async fn test_stream_requires_scope() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/notifications/stream").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userId veya restaurantId gereklidir");
}

#[tokio::test]
async fn test_stream_delivers_status_changes() {
    let app = TestApp::new();
    let order_id = app.place_order("user-1", "r-1").await;

    let response = app
        .send(
            Request::get("/api/notifications/stream?userId=user-1")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let (status, _) = app
        .patch(
            &format!("/api/orders/{order_id}/status"),
            &json!({ "status": "confirmed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let mut stream = response.into_body().into_data_stream();
    let mut received = String::new();
    let read = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(chunk)) = stream.next().await {
            received.push_str(&String::from_utf8_lossy(&chunk));
            if received.contains("\n\n") {
                break;
            }
        }
    })
    .await;
    assert!(read.is_ok(), "no event within timeout");

    assert!(received.contains("event: order_update"), "{received}");
    assert!(received.contains(&format!("\"orderId\":\"{order_id}\"")), "{received}");
}
