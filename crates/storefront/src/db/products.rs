//! Product repository for `PostgreSQL`: catalog reads and the stock ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use tradepost_core::{Price, ProductId, Quantity};

use super::{InventoryLedger, ProductCatalog, RepositoryError, Reservation};
use crate::models::{NewProduct, Product, StockFilter};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(r.price)
            .map_err(|e| RepositoryError::DataCorruption(format!("product {}: {e}", r.id)))?;
        if r.stock < 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "product {} has negative stock {}",
                r.id, r.stock
            )));
        }

        Ok(Self {
            id: ProductId::new(r.id),
            name: r.name,
            description: r.description,
            price,
            stock: r.stock,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for product database operations.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn list(&self, filter: StockFilter) -> Result<Vec<Product>, RepositoryError> {
        let sql = match filter {
            StockFilter::All => {
                r"SELECT id, name, description, price, stock, created_at, updated_at
                  FROM tradepost.product ORDER BY id"
            }
            StockFilter::Available => {
                r"SELECT id, name, description, price, stock, created_at, updated_at
                  FROM tradepost.product WHERE stock > 0 ORDER BY id"
            }
            StockFilter::Unavailable => {
                r"SELECT id, name, description, price, stock, created_at, updated_at
                  FROM tradepost.product WHERE stock = 0 ORDER BY id"
            }
        };

        let rows = sqlx::query_as::<_, ProductRow>(sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, stock, created_at, updated_at
            FROM tradepost.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO tradepost.product (name, description, price, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, price, stock, created_at, updated_at
            ",
        )
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.price.amount())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;

        Product::try_from(row)
    }
}

#[async_trait]
impl InventoryLedger for ProductRepository {
    /// Lock the product row, check, and decrement inside one transaction.
    ///
    /// `FOR UPDATE` makes concurrent reservations on the same product queue
    /// behind each other; reservations on different products do not block.
    /// Dropping the future before commit rolls the transaction back.
    #[tracing::instrument(skip(self))]
    async fn reserve(
        &self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Reservation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let stock: Option<i32> =
            sqlx::query_scalar("SELECT stock FROM tradepost.product WHERE id = $1 FOR UPDATE")
                .bind(product)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(stock) = stock else {
            tx.rollback().await?;
            return Ok(Reservation::NotFound);
        };

        if stock < quantity.get() {
            tx.rollback().await?;
            return Ok(Reservation::OutOfStock { available: stock });
        }

        let remaining: i32 = sqlx::query_scalar(
            r"
            UPDATE tradepost.product
            SET stock = stock - $2, updated_at = now()
            WHERE id = $1
            RETURNING stock
            ",
        )
        .bind(product)
        .bind(quantity.get())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Reservation::Reserved { remaining })
    }
}
