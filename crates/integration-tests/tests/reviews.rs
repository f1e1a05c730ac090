//! Review ownership, rating bounds and listings over HTTP.

use reqwest::StatusCode;
use serde_json::{Value, json};

use tradepost_integration_tests::{TestApp, message};

async fn review_id(resp: reqwest::Response) -> i64 {
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Invalid JSON");
    body["review"]["id"].as_i64().expect("review id")
}

#[tokio::test]
async fn test_only_the_author_can_edit_or_delete() {
    let app = TestApp::spawn().await;
    let author = app.shopper("author").await;
    let stranger = app.shopper("stranger").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    let id = review_id(
        app.post_review(
            &author.token,
            &json!({ "productId": product, "rating": 4, "comment": "Warm light" }),
        )
        .await,
    )
    .await;
    let url = app.url(&format!("/review/{id}"));

    let resp = app
        .client
        .put(&url)
        .bearer_auth(&stranger.token)
        .json(&json!({ "rating": 1 }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(resp).await, "You can only edit your own reviews");

    let resp = app
        .client
        .delete(&url)
        .bearer_auth(&stranger.token)
        .send()
        .await
        .expect("Failed to send delete");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(message(resp).await, "You can only delete your own reviews");

    let resp = app
        .client
        .put(&url)
        .bearer_auth(&author.token)
        .json(&json!({ "comment": "Warm light, sturdy base" }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["message"], "Review updated successfully");
    assert_eq!(body["review"]["rating"], 4);
    assert_eq!(body["review"]["comment"], "Warm light, sturdy base");

    let resp = app
        .client
        .delete(&url)
        .bearer_auth(&author.token)
        .send()
        .await
        .expect("Failed to send delete");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(message(resp).await, "Review deleted successfully");

    let resp = app
        .client
        .delete(&url)
        .bearer_auth(&author.token)
        .send()
        .await
        .expect("Failed to send delete");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(message(resp).await, "Review not found");
}

#[tokio::test]
async fn test_rating_must_be_between_one_and_five() {
    let app = TestApp::spawn().await;
    let author = app.shopper("author").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    for rating in [0, 6, -1] {
        let resp = app
            .post_review(&author.token, &json!({ "productId": product, "rating": rating }))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "rating {rating}");
        assert!(message(resp).await.starts_with("Invalid rating"));
    }

    for rating in [1, 5] {
        let resp = app
            .post_review(&author.token, &json!({ "productId": product, "rating": rating }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED, "rating {rating}");
    }

    let id = review_id(
        app.post_review(&author.token, &json!({ "productId": product, "rating": 3 }))
            .await,
    )
    .await;
    let resp = app
        .client
        .put(app.url(&format!("/review/{id}")))
        .bearer_auth(&author.token)
        .json(&json!({ "rating": 9 }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_author_comes_from_the_token() {
    let app = TestApp::spawn().await;
    let author = app.shopper("author").await;
    let victim = app.shopper("victim").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    let resp = app
        .post_review(
            &author.token,
            &json!({ "productId": product, "rating": 2, "userId": victim.id }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["message"], "Review added successfully");
    assert_eq!(body["review"]["userId"], json!(author.id));
}

#[tokio::test]
async fn test_listing_includes_usernames() {
    let app = TestApp::spawn().await;
    let ada = app.shopper("ada").await;
    let bob = app.shopper("bob").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    for (shopper, rating) in [(&ada, 5), (&bob, 3)] {
        let resp = app
            .post_review(&shopper.token, &json!({ "productId": product, "rating": rating }))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let reviews: Vec<Value> = app
        .client
        .get(app.url(&format!("/product/{product}/reviews")))
        .send()
        .await
        .expect("Failed to list reviews")
        .json()
        .await
        .expect("Invalid JSON");

    let mut usernames: Vec<&str> = reviews
        .iter()
        .filter_map(|r| r["username"].as_str())
        .collect();
    usernames.sort_unstable();
    assert_eq!(usernames, ["ada", "bob"]);
}

#[tokio::test]
async fn test_reviews_for_missing_product() {
    let app = TestApp::spawn().await;
    let author = app.shopper("author").await;

    let resp = app
        .client
        .get(app.url("/product/404/reviews"))
        .send()
        .await
        .expect("Failed to list reviews");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .post_review(&author.token, &json!({ "productId": 404, "rating": 4 }))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(message(resp).await, "Product not found");
}

#[tokio::test]
async fn test_deleting_a_product_removes_its_reviews() {
    let app = TestApp::spawn().await;
    let author = app.shopper("author").await;
    let product = app.create_product("Lamp", "20.00", 4).await;

    let id = review_id(
        app.post_review(&author.token, &json!({ "productId": product, "rating": 4 }))
            .await,
    )
    .await;
    app.store.remove_product(product).expect("remove product");

    let resp = app
        .client
        .delete(app.url(&format!("/review/{id}")))
        .bearer_auth(&author.token)
        .send()
        .await
        .expect("Failed to send delete");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
