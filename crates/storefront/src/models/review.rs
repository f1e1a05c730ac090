//! Review types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradepost_core::{ProductId, Rating, ReviewId, UserId};

use crate::services::ownership::Owned;

/// A product review.
///
/// `user_id` is fixed at creation and is the only key used to authorize
/// edits and deletes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Review {
    const KIND: &'static str = "review";

    fn owner(&self) -> UserId {
        self.user_id
    }
}

/// A review joined with its author's username, for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub username: String,
}

/// Validated input for creating a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub comment: Option<String>,
}

/// Partial update for a review. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub rating: Option<Rating>,
    pub comment: Option<String>,
}

impl ReviewPatch {
    /// Apply the provided fields to `review`.
    pub fn apply_to(&self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(comment) = &self.comment {
            review.comment = Some(comment.clone());
        }
    }
}
