//! Reviews: creation, listing, and ownership-gated edit/delete.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use tradepost_core::{ProductId, Rating, RatingError, ReviewId};

use crate::db::{ProductCatalog, RepositoryError, ReviewStore};
use crate::models::{CurrentUser, NewReview, Review, ReviewPatch, ReviewWithAuthor};
use crate::services::ownership::{NotOwner, authorize_owner};

/// Errors from review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("product not found")]
    ProductNotFound,

    #[error("review not found")]
    ReviewNotFound,

    /// `action` is the verb the caller attempted ("edit", "delete").
    #[error("cannot {action} review: {source}")]
    NotOwner {
        action: &'static str,
        #[source]
        source: NotOwner,
    },

    #[error(transparent)]
    InvalidRating(#[from] RatingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Changes requested by the caller, before validation.
#[derive(Debug, Clone, Default)]
pub struct ReviewEdit {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// Review operations over the catalog and review store.
pub struct ReviewService<'a> {
    products: &'a Arc<dyn ProductCatalog>,
    reviews: &'a Arc<dyn ReviewStore>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(
        products: &'a Arc<dyn ProductCatalog>,
        reviews: &'a Arc<dyn ReviewStore>,
    ) -> Self {
        Self { products, reviews }
    }

    /// Reviews for a product with their authors' usernames.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ProductNotFound` if the product does not exist.
    pub async fn list(&self, product: ProductId) -> Result<Vec<ReviewWithAuthor>, ReviewError> {
        if self.products.get(product).await?.is_none() {
            return Err(ReviewError::ProductNotFound);
        }
        Ok(self.reviews.list_for_product(product).await?)
    }

    /// Post a review as `author`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidRating` for ratings outside 1..=5 and
    /// `ReviewError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self, author, comment), fields(user = %author.id))]
    pub async fn create(
        &self,
        author: &CurrentUser,
        product: ProductId,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Review, ReviewError> {
        let rating = Rating::new(rating)?;

        if self.products.get(product).await?.is_none() {
            return Err(ReviewError::ProductNotFound);
        }

        let review = NewReview {
            user_id: author.id,
            product_id: product,
            rating,
            comment,
        };

        self.reviews.create(&review).await.map_err(|e| match e {
            RepositoryError::NotFound => ReviewError::ProductNotFound,
            other => other.into(),
        })
    }

    /// Apply `edit` to a review owned by `actor`.
    ///
    /// Ownership is checked before the input is validated, so a non-owner
    /// always gets the same rejection.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ReviewNotFound`, `ReviewError::NotOwner` or
    /// `ReviewError::InvalidRating`.
    #[instrument(skip(self, actor, edit), fields(user = %actor.id))]
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: ReviewId,
        edit: ReviewEdit,
    ) -> Result<Review, ReviewError> {
        self.load_owned(actor, id, "edit").await?;

        let patch = ReviewPatch {
            rating: edit.rating.map(Rating::new).transpose()?,
            comment: edit.comment,
        };

        self.reviews.update(id, &patch).await.map_err(|e| match e {
            RepositoryError::NotFound => ReviewError::ReviewNotFound,
            other => other.into(),
        })
    }

    /// Delete a review owned by `actor`.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::ReviewNotFound` or `ReviewError::NotOwner`.
    #[instrument(skip(self, actor), fields(user = %actor.id))]
    pub async fn delete(&self, actor: &CurrentUser, id: ReviewId) -> Result<(), ReviewError> {
        self.load_owned(actor, id, "delete").await?;

        if self.reviews.delete(id).await? {
            Ok(())
        } else {
            Err(ReviewError::ReviewNotFound)
        }
    }

    async fn load_owned(
        &self,
        actor: &CurrentUser,
        id: ReviewId,
        action: &'static str,
    ) -> Result<Review, ReviewError> {
        let review = self
            .reviews
            .get(id)
            .await?
            .ok_or(ReviewError::ReviewNotFound)?;

        authorize_owner(&review, actor).map_err(|source| {
            debug!(%source, "ownership check failed");
            ReviewError::NotOwner { action, source }
        })?;

        Ok(review)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tradepost_core::{Email, Price};

    use super::*;
    use crate::db::{CredentialStore, MemoryStore};
    use crate::models::NewProduct;

    struct Fixture {
        products: Arc<dyn ProductCatalog>,
        reviews: Arc<dyn ReviewStore>,
        alice: CurrentUser,
        bob: CurrentUser,
        product: ProductId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mut users = Vec::new();
        for name in ["alice", "bob"] {
            let email = Email::parse(&format!("{name}@example.com")).unwrap();
            let user = store
                .create_with_password(name, &email, "hash")
                .await
                .unwrap();
            users.push(CurrentUser { id: user.id, email });
        }
        let product = ProductCatalog::create(
            &*store,
            &NewProduct {
                name: "Teapot".to_string(),
                description: None,
                price: Price::new(Decimal::new(1500, 2)).unwrap(),
                stock: 3,
            },
        )
        .await
        .unwrap()
        .id;

        let bob = users.pop().unwrap();
        let alice = users.pop().unwrap();
        Fixture {
            products: store.clone(),
            reviews: store,
            alice,
            bob,
            product,
        }
    }

    #[tokio::test]
    async fn test_rating_bounds_on_create() {
        let f = fixture().await;
        let service = ReviewService::new(&f.products, &f.reviews);

        for bad in [0, 6] {
            let err = service
                .create(&f.alice, f.product, bad, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ReviewError::InvalidRating(_)), "{bad}");
        }
        for good in [1, 5] {
            let review = service
                .create(&f.alice, f.product, good, None)
                .await
                .unwrap();
            assert_eq!(i64::from(review.rating.get()), good);
        }
    }

    #[tokio::test]
    async fn test_create_for_missing_product() {
        let f = fixture().await;
        let service = ReviewService::new(&f.products, &f.reviews);
        let err = service
            .create(&f.alice, ProductId::new(999), 4, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::ProductNotFound));
    }

    #[tokio::test]
    async fn test_only_owner_can_edit_or_delete() {
        let f = fixture().await;
        let service = ReviewService::new(&f.products, &f.reviews);
        let review = service
            .create(&f.alice, f.product, 3, Some("fine".to_string()))
            .await
            .unwrap();

        let edit = ReviewEdit {
            rating: Some(1),
            comment: None,
        };
        let err = service
            .update(&f.bob, review.id, edit.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotOwner { action: "edit", .. }));

        let err = service.delete(&f.bob, review.id).await.unwrap_err();
        assert!(matches!(
            err,
            ReviewError::NotOwner {
                action: "delete",
                ..
            }
        ));

        let updated = service.update(&f.alice, review.id, edit).await.unwrap();
        assert_eq!(updated.rating.get(), 1);
        assert_eq!(updated.comment.as_deref(), Some("fine"));

        service.delete(&f.alice, review.id).await.unwrap();
        assert!(matches!(
            service.delete(&f.alice, review.id).await,
            Err(ReviewError::ReviewNotFound)
        ));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_rating() {
        let f = fixture().await;
        let service = ReviewService::new(&f.products, &f.reviews);
        let review = service
            .create(&f.alice, f.product, 4, None)
            .await
            .unwrap();

        let updated = service
            .update(
                &f.alice,
                review.id,
                ReviewEdit {
                    rating: None,
                    comment: Some("better than expected".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.rating.get(), 4);
        assert_eq!(updated.comment.as_deref(), Some("better than expected"));
    }

    #[tokio::test]
    async fn test_edit_rating_bounds() {
        let f = fixture().await;
        let service = ReviewService::new(&f.products, &f.reviews);
        let review = service
            .create(&f.alice, f.product, 2, None)
            .await
            .unwrap();

        for bad in [0, 6] {
            let err = service
                .update(
                    &f.alice,
                    review.id,
                    ReviewEdit {
                        rating: Some(bad),
                        comment: None,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ReviewError::InvalidRating(_)));
        }

        let unchanged = f.reviews.get(review.id).await.unwrap().unwrap();
        assert_eq!(unchanged.rating.get(), 2);
    }

    #[tokio::test]
    async fn test_listing_includes_author() {
        let f = fixture().await;
        let service = ReviewService::new(&f.products, &f.reviews);
        service.create(&f.bob, f.product, 5, None).await.unwrap();

        let listed = service.list(f.product).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "bob");

        assert!(matches!(
            service.list(ProductId::new(999)).await,
            Err(ReviewError::ProductNotFound)
        ));
    }
}
