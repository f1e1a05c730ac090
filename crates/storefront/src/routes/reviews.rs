//! Review route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use tradepost_core::{ProductId, ReviewId};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::{Review, ReviewWithAuthor};
use crate::services::reviews::{ReviewEdit, ReviewService};
use crate::state::AppState;

/// Review creation request body.
///
/// There is no author field: the author is always the token's user.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: ProductId,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Review update request body. Omitted fields keep their stored value.
#[derive(Deserialize, Default)]
pub struct UpdateReviewRequest {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response carrying a single review.
#[derive(Serialize)]
pub struct ReviewResponse {
    pub message: String,
    pub review: Review,
}

fn service(state: &AppState) -> ReviewService<'_> {
    let repos = state.repos();
    ReviewService::new(&repos.products, &repos.reviews)
}

/// Reviews for one product, with author usernames.
pub async fn list(
    State(state): State<AppState>,
    ApiPath(product): ApiPath<ProductId>,
) -> Result<Json<Vec<ReviewWithAuthor>>> {
    Ok(Json(service(&state).list(product).await?))
}

/// Post a review.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    let review = service(&state)
        .create(&user, body.product_id, body.rating, body.comment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review added successfully".to_string(),
            review,
        }),
    ))
}

/// Edit one of the caller's reviews.
#[instrument(skip_all, fields(review = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ReviewId>,
    ApiJson(body): ApiJson<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>> {
    let edit = ReviewEdit {
        rating: body.rating,
        comment: body.comment,
    };
    let review = service(&state).update(&user, id, edit).await?;

    Ok(Json(ReviewResponse {
        message: "Review updated successfully".to_string(),
        review,
    }))
}

/// Delete one of the caller's reviews.
#[instrument(skip_all, fields(review = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ReviewId>,
) -> Result<Json<Value>> {
    service(&state).delete(&user, id).await?;
    Ok(Json(json!({ "message": "Review deleted successfully" })))
}
