//! Purchase flow over HTTP: stock accounting, validation, no overselling.

use reqwest::StatusCode;
use serde_json::{Value, json};

use tradepost_integration_tests::{TestApp, message};

async fn stock_over_http(app: &TestApp, product: tradepost_core::ProductId) -> i64 {
    let body: Value = app
        .client
        .get(app.url(&format!("/product/{product}")))
        .send()
        .await
        .expect("Failed to fetch product")
        .json()
        .await
        .expect("Invalid JSON");
    body["stock"].as_i64().expect("stock field")
}

#[tokio::test]
async fn test_stock_is_consumed_until_sold_out() {
    let app = TestApp::spawn().await;
    let shopper = app.shopper("ada").await;
    let product = app.create_product("Walnut Desk Organizer", "34.50", 5).await;

    let resp = app.purchase(&shopper.token, product, 3).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["message"], "Purchase successful");
    assert_eq!(body["purchase"]["quantity"], 3);
    assert_eq!(stock_over_http(&app, product).await, 2);

    let resp = app.purchase(&shopper.token, product, 3).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        message(resp).await,
        "Insufficient stock. Only 2 units available."
    );
    assert_eq!(stock_over_http(&app, product).await, 2);

    let resp = app.purchase(&shopper.token, product, 2).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(stock_over_http(&app, product).await, 0);

    let sold_out: Vec<Value> = app
        .client
        .get(app.url("/products/unavailable"))
        .send()
        .await
        .expect("Failed to list")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(sold_out.len(), 1);

    let purchases = app.store.purchases().expect("purchase log");
    assert_eq!(purchases.len(), 2);
}

#[tokio::test]
async fn test_purchase_is_attributed_to_token_user() {
    let app = TestApp::spawn().await;
    let buyer = app.shopper("buyer").await;
    let other = app.shopper("other").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    // A client-supplied user id must not override the token identity.
    let resp = app
        .client
        .post(app.url(&format!("/products/{product}/purchase")))
        .bearer_auth(&buyer.token)
        .json(&json!({ "quantity": 1, "userId": other.id }))
        .send()
        .await
        .expect("Failed to send purchase");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["purchase"]["userId"], json!(buyer.id));
}

#[tokio::test]
async fn test_non_positive_quantity_rejected() {
    let app = TestApp::spawn().await;
    let shopper = app.shopper("zed").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    for quantity in [0, -1] {
        let resp = app.purchase(&shopper.token, product, quantity).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(message(resp).await.starts_with("Invalid quantity"));
    }
    assert_eq!(app.store.stock_of(product).await, Some(4));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = TestApp::spawn().await;
    let shopper = app.shopper("zed").await;

    let resp = app
        .purchase(&shopper.token, tradepost_core::ProductId::new(999), 1)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(message(resp).await, "Product not found");
}

#[tokio::test]
async fn test_purchase_without_token_leaves_stock_alone() {
    let app = TestApp::spawn().await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    let resp = app
        .client
        .post(app.url(&format!("/products/{product}/purchase")))
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .expect("Failed to send purchase");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.stock_of(product).await, Some(4));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::spawn().await;
    let shopper = app.shopper("zed").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    let resp = app
        .client
        .post(app.url(&format!("/products/{product}/purchase")))
        .bearer_auth(&shopper.token)
        .header("content-type", "application/json")
        .body("{\"quantity\":")
        .send()
        .await
        .expect("Failed to send purchase");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert!(body["message"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_never_oversell() {
    let app = TestApp::spawn().await;
    let product = app.create_product("Limited Print", "80.00", 10).await;

    let mut tokens = Vec::new();
    for i in 0..25 {
        tokens.push(app.shopper(&format!("buyer{i}")).await.token);
    }

    let mut handles = Vec::new();
    for token in tokens {
        let client = app.client.clone();
        let url = app.url(&format!("/products/{product}/purchase"));
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "quantity": 1 }))
                .send()
                .await
                .expect("Failed to send purchase")
                .status()
        }));
    }

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => rejected += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(created, 10);
    assert_eq!(rejected, 15);
    assert_eq!(app.store.stock_of(product).await, Some(0));
    assert_eq!(app.store.purchases().expect("purchase log").len(), 10);
}
