//! Purchase repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tradepost_core::{ProductId, PurchaseId, Quantity, UserId};

use super::{PurchaseRecorder, RepositoryError};
use crate::models::Purchase;

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    quantity: i32,
    created_at: DateTime<Utc>,
}

/// Repository for the append-only purchase log.
#[derive(Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseRecorder for PurchaseRepository {
    async fn record(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Purchase, RepositoryError> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            r"
            INSERT INTO tradepost.purchase (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, product_id, quantity, created_at
            ",
        )
        .bind(user)
        .bind(product)
        .bind(quantity.get())
        .fetch_one(&self.pool)
        .await?;

        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| {
            RepositoryError::DataCorruption(format!("purchase {}: {e}", row.id))
        })?;

        Ok(Purchase {
            id: PurchaseId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            quantity,
            created_at: row.created_at,
        })
    }
}
