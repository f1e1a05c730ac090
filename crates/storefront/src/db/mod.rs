//! Storage layer for the storefront.
//!
//! # Tables (`PostgreSQL`)
//!
//! - `tradepost.user` - Shoppers with Argon2id password hashes (unique email)
//! - `tradepost.product` - Catalog entries with `stock >= 0`
//! - `tradepost.purchase` - Immutable purchase lines
//! - `tradepost.review` - Ratings and comments, one owner each
//!
//! Purchases and reviews cascade when their user or product is deleted.
//!
//! # Backends
//!
//! Every table sits behind a trait so the services never see `sqlx`:
//! the `PostgreSQL` repositories in this module are used in production and
//! [`memory::MemoryStore`] backs tests and local experiments.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p tradepost-cli -- migrate
//! ```

pub mod memory;
pub mod products;
pub mod purchases;
pub mod reviews;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tradepost_core::{Email, ProductId, Quantity, ReviewId, UserId};

use crate::models::{
    NewProduct, NewReview, Product, Purchase, Review, ReviewPatch, ReviewWithAuthor, StockFilter,
    User,
};

pub use memory::MemoryStore;
pub use products::ProductRepository;
pub use purchases::PurchaseRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The backend could not serve the request (e.g., poisoned lock).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Outcome of a stock reservation.
///
/// `OutOfStock` and `NotFound` are business outcomes, not errors; storage
/// failures travel separately as `RepositoryError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Stock was decremented; `remaining` is the post-decrement value.
    Reserved { remaining: i32 },
    /// Not enough units; stock is unchanged.
    OutOfStock { available: i32 },
    /// No such product; nothing was touched.
    NotFound,
}

/// Persistence for user accounts and password hashes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by normalized email.
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Look up a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Create a user. Returns `Conflict` if the email is taken.
    async fn create_with_password(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Fetch a user together with their password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Read access to the catalog plus product creation.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// List products, ordered by ID.
    async fn list(&self, filter: StockFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Get a single product.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a new product.
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError>;
}

/// Owner of product stock counts.
///
/// `reserve` is the only way stock changes. Implementations must serialize
/// the check-and-decrement per product so that concurrent reservations can
/// never drive stock below zero.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Atomically take `quantity` units of `product` if available.
    async fn reserve(
        &self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Reservation, RepositoryError>;
}

/// Append-only log of purchases.
#[async_trait]
pub trait PurchaseRecorder: Send + Sync {
    /// Record a purchase line after a successful reservation.
    async fn record(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Purchase, RepositoryError>;
}

/// Persistence for reviews.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// All reviews for a product, oldest first, with author usernames.
    async fn list_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError>;

    /// Get a review by ID.
    async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;

    /// Insert a new review.
    async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError>;

    /// Apply a patch. Returns `NotFound` if the review vanished.
    async fn update(&self, id: ReviewId, patch: &ReviewPatch) -> Result<Review, RepositoryError>;

    /// Delete a review. Returns `false` if it did not exist.
    async fn delete(&self, id: ReviewId) -> Result<bool, RepositoryError>;
}

/// Liveness check for the backing store.
#[async_trait]
pub trait StorageHealth: Send + Sync {
    /// Succeeds if the backend can serve queries.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// The full set of storage handles the services need.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn CredentialStore>,
    pub products: Arc<dyn ProductCatalog>,
    pub inventory: Arc<dyn InventoryLedger>,
    pub purchases: Arc<dyn PurchaseRecorder>,
    pub reviews: Arc<dyn ReviewStore>,
    pub health: Arc<dyn StorageHealth>,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let products = Arc::new(ProductRepository::new(pool.clone()));
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            products: products.clone(),
            inventory: products,
            purchases: Arc::new(PurchaseRepository::new(pool.clone())),
            reviews: Arc::new(ReviewRepository::new(pool.clone())),
            health: Arc::new(PgHealth(pool)),
        }
    }

    /// Repositories backed by a single in-memory store.
    #[must_use]
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            products: store.clone(),
            inventory: store.clone(),
            purchases: store.clone(),
            reviews: store.clone(),
            health: store,
        }
    }
}

struct PgHealth(PgPool);

#[async_trait]
impl StorageHealth for PgHealth {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.0).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
