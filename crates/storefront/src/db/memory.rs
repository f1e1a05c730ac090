//! In-memory storage backend.
//!
//! Implements every storage trait over process-local maps. Used by the test
//! suites and handy for running the API without a database. Each product
//! lives behind its own async mutex, so reservations are serialized per
//! product exactly like the `FOR UPDATE` path in `PostgreSQL`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use tradepost_core::{Email, ProductId, PurchaseId, Quantity, ReviewId, UserId};

use super::{
    CredentialStore, InventoryLedger, ProductCatalog, PurchaseRecorder, RepositoryError,
    Reservation, ReviewStore, StorageHealth,
};
use crate::models::{
    NewProduct, NewReview, Product, Purchase, Review, ReviewPatch, ReviewWithAuthor, StockFilter,
    User,
};

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("in-memory lock poisoned".to_owned())
}

#[derive(Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

/// Process-local implementation of all storage traits.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<UserId, StoredUser>>,
    products: RwLock<BTreeMap<ProductId, Arc<Mutex<Product>>>>,
    purchases: RwLock<Vec<Purchase>>,
    reviews: RwLock<BTreeMap<ReviewId, Review>>,
    next_user: AtomicI32,
    next_product: AtomicI32,
    next_purchase: AtomicI32,
    next_review: AtomicI32,
    purchase_log_offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `PurchaseRecorder::record` fail until switched back.
    ///
    /// Simulates the purchase log going down between reservation and
    /// recording.
    pub fn set_purchase_log_offline(&self, offline: bool) {
        self.purchase_log_offline.store(offline, Ordering::SeqCst);
    }

    /// Current stock of a product, if it exists.
    pub async fn stock_of(&self, id: ProductId) -> Option<i32> {
        let cell = self.product_cell(id).ok()??;
        let product = cell.lock().await;
        Some(product.stock)
    }

    /// Snapshot of every recorded purchase.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if a lock is poisoned.
    pub fn purchases(&self) -> Result<Vec<Purchase>, RepositoryError> {
        Ok(self.purchases.read().map_err(poisoned)?.clone())
    }

    /// Delete a product, cascading to its purchases and reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if a lock is poisoned.
    pub fn remove_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let removed = self.products.write().map_err(poisoned)?.remove(&id).is_some();
        if removed {
            self.purchases
                .write()
                .map_err(poisoned)?
                .retain(|p| p.product_id != id);
            self.reviews
                .write()
                .map_err(poisoned)?
                .retain(|_, r| r.product_id != id);
        }
        Ok(removed)
    }

    /// Delete a user, cascading to their purchases and reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if a lock is poisoned.
    pub fn remove_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        let removed = self.users.write().map_err(poisoned)?.remove(&id).is_some();
        if removed {
            self.purchases
                .write()
                .map_err(poisoned)?
                .retain(|p| p.user_id != id);
            self.reviews
                .write()
                .map_err(poisoned)?
                .retain(|_, r| r.user_id != id);
        }
        Ok(removed)
    }

    fn product_cell(&self, id: ProductId) -> Result<Option<Arc<Mutex<Product>>>, RepositoryError> {
        Ok(self.products.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn product_exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.products.read().map_err(poisoned)?.contains_key(&id))
    }
}

fn next_id(counter: &AtomicI32) -> i32 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|s| &s.user.email == email)
            .map(|s| s.user.clone()))
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&id).map(|s| s.user.clone()))
    }

    async fn create_with_password(
        &self,
        username: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.values().any(|s| &s.user.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(next_id(&self.next_user)),
            username: username.to_owned(),
            email: email.clone(),
            created_at: now,
            updated_at: now,
        };
        users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        Ok(user)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .values()
            .find(|s| &s.user.email == email)
            .map(|s| (s.user.clone(), s.password_hash.clone())))
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn list(&self, filter: StockFilter) -> Result<Vec<Product>, RepositoryError> {
        let cells: Vec<_> = self
            .products
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();

        let mut products = Vec::with_capacity(cells.len());
        for cell in cells {
            let product = cell.lock().await;
            if filter.matches(product.stock) {
                products.push(product.clone());
            }
        }
        Ok(products)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let Some(cell) = self.product_cell(id)? else {
            return Ok(None);
        };
        let product = cell.lock().await;
        Ok(Some(product.clone()))
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        // Same rule as the `stock >= 0` CHECK on tradepost.product
        if product.stock < 0 {
            return Err(RepositoryError::Conflict(format!(
                "product stock must not be negative (got {})",
                product.stock
            )));
        }

        let now = Utc::now();
        let created = Product {
            id: ProductId::new(next_id(&self.next_product)),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        self.products
            .write()
            .map_err(poisoned)?
            .insert(created.id, Arc::new(Mutex::new(created.clone())));
        Ok(created)
    }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn reserve(
        &self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Reservation, RepositoryError> {
        let Some(cell) = self.product_cell(product)? else {
            return Ok(Reservation::NotFound);
        };

        // Held for the whole check-and-decrement.
        let mut row = cell.lock().await;
        if row.stock < quantity.get() {
            return Ok(Reservation::OutOfStock {
                available: row.stock,
            });
        }
        row.stock -= quantity.get();
        row.updated_at = Utc::now();

        Ok(Reservation::Reserved {
            remaining: row.stock,
        })
    }
}

#[async_trait]
impl PurchaseRecorder for MemoryStore {
    async fn record(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Purchase, RepositoryError> {
        if self.purchase_log_offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "purchase log offline".to_owned(),
            ));
        }

        let purchase = Purchase {
            id: PurchaseId::new(next_id(&self.next_purchase)),
            user_id: user,
            product_id: product,
            quantity,
            created_at: Utc::now(),
        };
        self.purchases
            .write()
            .map_err(poisoned)?
            .push(purchase.clone());
        Ok(purchase)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn list_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let reviews = self.reviews.read().map_err(poisoned)?;
        let users = self.users.read().map_err(poisoned)?;

        reviews
            .values()
            .filter(|r| r.product_id == product)
            .map(|r| {
                let username = users
                    .get(&r.user_id)
                    .map(|s| s.user.username.clone())
                    .ok_or_else(|| {
                        RepositoryError::DataCorruption(format!(
                            "review {} has no author {}",
                            r.id, r.user_id
                        ))
                    })?;
                Ok(ReviewWithAuthor {
                    review: r.clone(),
                    username,
                })
            })
            .collect()
    }

    async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.reviews.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        if !self.product_exists(review.product_id)? {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        let created = Review {
            id: ReviewId::new(next_id(&self.next_review)),
            user_id: review.user_id,
            product_id: review.product_id,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: now,
            updated_at: now,
        };
        self.reviews
            .write()
            .map_err(poisoned)?
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: ReviewId, patch: &ReviewPatch) -> Result<Review, RepositoryError> {
        let mut reviews = self.reviews.write().map_err(poisoned)?;
        let review = reviews.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        patch.apply_to(review);
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        Ok(self
            .reviews
            .write()
            .map_err(poisoned)?
            .remove(&id)
            .is_some())
    }
}

#[async_trait]
impl StorageHealth for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
