//! Catalog listings, product creation and health endpoints.

use reqwest::StatusCode;
use serde_json::{Value, json};

use tradepost_integration_tests::{TestApp, message};

async fn names(app: &TestApp, path: &str) -> Vec<String> {
    let products: Vec<Value> = app
        .client
        .get(app.url(path))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Invalid JSON");
    products
        .iter()
        .filter_map(|p| p["name"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_listings_split_by_stock() {
    let app = TestApp::spawn().await;
    app.create_product("Lamp", "20.00", 4).await;
    app.create_product("Brass Bookmark", "6.00", 0).await;

    assert_eq!(names(&app, "/allproducts").await, ["Lamp", "Brass Bookmark"]);
    assert_eq!(names(&app, "/products/available").await, ["Lamp"]);
    assert_eq!(names(&app, "/products/unavailable").await, ["Brass Bookmark"]);
}

#[tokio::test]
async fn test_product_fields_round_trip() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/createproduct"))
        .json(&json!({
            "name": "Walnut Desk Organizer",
            "description": "Five compartments",
            "price": 34.5,
            "stock": 12
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["message"], "Product created successfully");
    let id = body["product"]["id"].as_i64().expect("product id");

    let product: Value = app
        .client
        .get(app.url(&format!("/product/{id}")))
        .send()
        .await
        .expect("Failed to fetch product")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(product["name"], "Walnut Desk Organizer");
    assert_eq!(product["description"], "Five compartments");
    assert_eq!(product["stock"], 12);
    assert_eq!(product["price"], "34.5");
}

#[tokio::test]
async fn test_invalid_products_rejected() {
    let app = TestApp::spawn().await;

    for body in [
        json!({ "name": "", "price": "1.00", "stock": 1 }),
        json!({ "name": "Lamp", "price": "-1.00", "stock": 1 }),
        json!({ "name": "Lamp", "price": "1.00", "stock": -1 }),
        json!({ "name": "Lamp", "stock": 1 }),
    ] {
        let resp = app
            .client
            .post(app.url("/createproduct"))
            .json(&body)
            .send()
            .await
            .expect("Failed to create product");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }

    assert!(names(&app, "/allproducts").await.is_empty());
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/product/12345"))
        .send()
        .await
        .expect("Failed to fetch product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(message(resp).await, "Product not found");

    let resp = app
        .client
        .get(app.url("/product/not-a-number"))
        .send()
        .await
        .expect("Failed to fetch product");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to get health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = app
        .client
        .get(app.url("/health/ready"))
        .send()
        .await
        .expect("Failed to get readiness");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .expect("Failed to get health");
    assert_eq!(
        resp.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("trace-me-123")
    );

    let resp = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to get health");
    assert!(resp.headers().contains_key("x-request-id"));
}
