//! Review repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tradepost_core::{ProductId, Rating, ReviewId, UserId};

use super::{RepositoryError, ReviewStore};
use crate::models::{NewReview, Review, ReviewPatch, ReviewWithAuthor};

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(r.rating))
            .map_err(|e| RepositoryError::DataCorruption(format!("review {}: {e}", r.id)))?;

        Ok(Self {
            id: ReviewId::new(r.id),
            user_id: UserId::new(r.user_id),
            product_id: ProductId::new(r.product_id),
            rating,
            comment: r.comment,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewWithAuthorRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    username: String,
}

/// Repository for review database operations.
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for ReviewRepository {
    async fn list_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewWithAuthorRow>(
            r"
            SELECT r.id, r.user_id, r.product_id, r.rating, r.comment,
                   r.created_at, r.updated_at, u.username
            FROM tradepost.review r
            JOIN tradepost.user u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at ASC, r.id ASC
            ",
        )
        .bind(product)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ReviewWithAuthor {
                    review: Review::try_from(r.review)?,
                    username: r.username,
                })
            })
            .collect()
    }

    async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, user_id, product_id, rating, comment, created_at, updated_at
            FROM tradepost.review
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO tradepost.review (user_id, product_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, product_id, rating, comment, created_at, updated_at
            ",
        )
        .bind(review.user_id)
        .bind(review.product_id)
        .bind(review.rating.get())
        .bind(review.comment.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // The product can disappear between the existence check and the insert.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Review::try_from(row)
    }

    async fn update(&self, id: ReviewId, patch: &ReviewPatch) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            UPDATE tradepost.review
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, product_id, rating, comment, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(patch.rating.map(Rating::get))
        .bind(patch.comment.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tradepost.review WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
