//! AI endpoints answer with deterministic data when the model is down.

use axum::http::StatusCode;
use neyisek_integration_tests::TestApp;
use serde_json::{Value, json};

fn assert_fallback(body: &Value) {
    assert_eq!(body["success"], false);
    assert_eq!(body["fallback"], true);
    assert_eq!(body["error"], "AI servisi şu anda kullanılamıyor");
}

#[tokio::test]
async fn test_chatbot_fallback_answers_by_keyword() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/ai/chatbot",
            &json!({
                "message": "Ödeme seçenekleri neler?",
                "history": [{ "role": "user", "content": "Merhaba" }],
                "context": { "userName": "Zeynep", "cartItemCount": 2 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_fallback(&body);
    let reply = body["data"]["reply"].as_str().unwrap_or_default();
    assert!(reply.contains("online ödeme"), "{reply}");
}

#[tokio::test]
async fn test_chatbot_requires_message() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/ai/chatbot", &json!({ "message": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Mesaj gereklidir");
}

#[tokio::test]
async fn test_recommendations_fallback_respects_limit() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/ai/recommendations",
            &json!({ "userId": "user-1", "preferences": ["acı"], "limit": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_fallback(&body);
    let items = body["data"]["recommendations"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["name"], "Adana Kebap");
}

#[tokio::test]
async fn test_search_fallback_splits_keywords() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/ai/search", &json!({ "query": "Acılı  Adana kebap" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_fallback(&body);
    assert_eq!(body["data"]["intent"], "search");
    assert_eq!(body["data"]["keywords"], json!(["acılı", "adana", "kebap"]));
}

#[tokio::test]
async fn test_cross_sell_fallback_skips_cart_items() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/ai/cross-sell",
            &json!({ "cartItems": [
                { "name": "Adana Kebap", "price": 180, "quantity": 1 },
                { "name": "ayran", "price": 30, "quantity": 2 }
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_fallback(&body);
    let names: Vec<&str> = body["data"]["suggestions"]
        .as_array()
        .map(|s| s.iter().filter_map(|v| v["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Künefe", "Mevsim Salata", "Su"]);
}

#[tokio::test]
async fn test_cross_sell_requires_items() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/ai/cross-sell", &json!({ "cartItems": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Sepet boş");
}

#[tokio::test]
async fn test_pricing_fallback_keeps_prices() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/ai/pricing",
            &json!({
                "restaurantId": "r-1",
                "demandLevel": "high",
                "items": [{ "name": "Lahmacun", "price": 90 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_fallback(&body);
    let adjustment = &body["data"]["adjustments"][0];
    assert_eq!(adjustment["name"], "Lahmacun");
    assert_eq!(adjustment["currentPrice"], adjustment["suggestedPrice"]);
}

#[tokio::test]
async fn test_unknown_fields_are_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/ai/search", &json!({ "query": "pide", "message": "selam" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Geçersiz istek gövdesi");
}
