//! Integration tests for Tradepost.
//!
//! Each test spawns the real storefront router on an ephemeral port,
//! backed by [`MemoryStore`], and talks to it over HTTP with `reqwest`.
//! No database or running server is needed:
//!
//! ```bash
//! cargo test -p tradepost-integration-tests
//! ```
//!
//! The `/auth` routes are rate limited (burst of 5 per client IP, per
//! spawned app). Tests that only need an authenticated caller should use
//! [`TestApp::shopper`], which writes the user straight to storage and
//! mints the token locally, instead of going through sign-up and sign-in.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::{Value, json};

use tradepost_core::{Email, ProductId, UserId};
use tradepost_storefront::db::{CredentialStore, MemoryStore, Repositories};
use tradepost_storefront::services::tokens::TokenAuthority;
use tradepost_storefront::RouterOptions;
use tradepost_storefront::state::AppState;

/// HMAC key shared by the spawned app and the local token minting.
pub const TEST_SECRET: &str = "hX9#kQ2$vL7@nP4!wR8^tY3&zM6*bC1%";

/// A registered user and a valid token for them.
#[derive(Debug, Clone)]
pub struct Shopper {
    pub id: UserId,
    pub email: Email,
    pub token: String,
}

/// A running storefront plus handles into its storage.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub store: Arc<MemoryStore>,
    tokens: TokenAuthority,
}

impl TestApp {
    /// Spawn the storefront on `127.0.0.1:0` with default router options.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        Self::spawn_with(RouterOptions::default()).await
    }

    /// Spawn the storefront with explicit router options.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn_with(options: RouterOptions) -> Self {
        let store = Arc::new(MemoryStore::new());
        let secret = SecretString::from(TEST_SECRET);
        let state = AppState::from_parts(
            Repositories::in_memory(store.clone()),
            TokenAuthority::new(&secret),
        );
        let app = tradepost_storefront::app(state, options);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            store,
            tokens: TokenAuthority::new(&secret),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Create a user directly in storage and mint a token for them.
    ///
    /// The stored password hash is not a real hash, so this user cannot
    /// sign in over HTTP.
    ///
    /// # Panics
    ///
    /// Panics if the email is invalid or already taken.
    pub async fn shopper(&self, username: &str) -> Shopper {
        let email = Email::parse(&format!("{username}@example.com")).expect("valid email");
        let user = self
            .store
            .create_with_password(username, &email, "not-a-real-hash")
            .await
            .expect("Failed to create shopper");
        let token = self.token_at(user.id, &email, Utc::now());

        Shopper {
            id: user.id,
            email,
            token,
        }
    }

    /// Mint a token for `user` as if issued at `issued_at`.
    ///
    /// # Panics
    ///
    /// Panics if signing fails.
    #[must_use]
    pub fn token_at(&self, user: UserId, email: &Email, issued_at: DateTime<Utc>) -> String {
        self.tokens
            .issue_at(user, email, issued_at)
            .expect("Failed to sign token")
    }

    /// Create a product over HTTP and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or is rejected.
    pub async fn create_product(&self, name: &str, price: &str, stock: i64) -> ProductId {
        let resp = self
            .client
            .post(self.url("/createproduct"))
            .json(&json!({ "name": name, "price": price, "stock": stock }))
            .send()
            .await
            .expect("Failed to create product");
        assert_eq!(resp.status(), 201, "product creation rejected");

        let body: Value = resp.json().await.expect("Invalid JSON");
        let id = body["product"]["id"].as_i64().expect("product id");
        ProductId::new(i32::try_from(id).expect("id fits in i32"))
    }

    /// Purchase `quantity` units of `product` with `token`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn purchase(&self, token: &str, product: ProductId, quantity: i64) -> Response {
        self.client
            .post(self.url(&format!("/products/{product}/purchase")))
            .bearer_auth(token)
            .json(&json!({ "quantity": quantity }))
            .send()
            .await
            .expect("Failed to send purchase")
    }

    /// Post a review with `token`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_review(&self, token: &str, body: &Value) -> Response {
        self.client
            .post(self.url("/review"))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send review")
    }
}

/// Read a response's `message` field.
///
/// # Panics
///
/// Panics if the body is not JSON with a string `message`.
pub async fn message(resp: Response) -> String {
    let body: Value = resp.json().await.expect("Invalid JSON");
    body["message"]
        .as_str()
        .expect("message field")
        .to_string()
}
