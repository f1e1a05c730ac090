//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (rate limited)
//! POST   /auth/signup                  - Register
//! POST   /auth/signin                  - Get an identity token
//! GET    /auth/profile                 - Greeting for the token's user (bearer)
//! POST   /auth/logout                  - Acknowledge logout (bearer)
//!
//! # Catalog
//! GET    /allproducts                  - All products
//! GET    /products/available           - Products with stock > 0
//! GET    /products/unavailable         - Products with stock = 0
//! GET    /product/{id}                 - One product
//! POST   /createproduct                - Add a product
//!
//! # Purchases
//! POST   /products/{id}/purchase       - Buy units (bearer)
//!
//! # Reviews
//! GET    /product/{id}/reviews         - Reviews with author usernames
//! POST   /review                       - Post a review (bearer)
//! PUT    /review/{id}                  - Edit own review (bearer)
//! DELETE /review/{id}                  - Delete own review (bearer)
//! ```

pub mod auth;
pub mod products;
pub mod reviews;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// See [`ClientIpKeyExtractor`](crate::middleware::rate_limit::ClientIpKeyExtractor)
/// for `trust_proxy_headers`.
pub fn auth_routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/profile", get(auth::profile))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter(trust_proxy_headers))
}

/// Create the catalog and purchase routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/allproducts", get(products::all))
        .route("/products/available", get(products::available))
        .route("/products/unavailable", get(products::unavailable))
        .route("/product/{id}", get(products::show))
        .route("/createproduct", post(products::create))
        .route("/products/{id}/purchase", post(products::purchase))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/product/{id}/reviews", get(reviews::list))
        .route("/review", post(reviews::create))
        .route(
            "/review/{id}",
            put(reviews::update).delete(reviews::delete),
        )
}

/// Create all routes for the storefront.
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(trust_proxy_headers))
        .merge(product_routes())
        .merge(review_routes())
}
