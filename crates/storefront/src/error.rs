//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Business outcomes map to
//! specific statuses with a readable message; infrastructure failures are
//! captured to Sentry and reported as an opaque `500`. Every error body is
//! JSON: `{"message": "..."}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::CurrentUser;
use crate::services::auth::AuthError;
use crate::services::purchases::PurchaseError;
use crate::services::reviews::ReviewError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Purchase flow failed.
    #[error("Purchase error: {0}")]
    Purchase(#[from] PurchaseError),

    /// Review operation failed.
    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, malformed, expired or forged bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::EmptyUsername => StatusCode::BAD_REQUEST,
                AuthError::Token(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Purchase(err) => match err {
                PurchaseError::ProductNotFound => StatusCode::NOT_FOUND,
                PurchaseError::OutOfStock { .. } => StatusCode::BAD_REQUEST,
                PurchaseError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Review(err) => match err {
                ReviewError::ProductNotFound | ReviewError::ReviewNotFound => StatusCode::NOT_FOUND,
                ReviewError::NotOwner { .. } => StatusCode::FORBIDDEN,
                ReviewError::InvalidRating(_) => StatusCode::BAD_REQUEST,
                ReviewError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => "User already exists.".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::EmptyUsername => "Username is required".to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::Purchase(err) => match err {
                PurchaseError::ProductNotFound => "Product not found".to_string(),
                PurchaseError::OutOfStock { available } => {
                    format!("Insufficient stock. Only {available} units available.")
                }
                PurchaseError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Review(err) => match err {
                ReviewError::ProductNotFound => "Product not found".to_string(),
                ReviewError::ReviewNotFound => "Review not found".to_string(),
                ReviewError::NotOwner { action, .. } => {
                    format!("You can only {action} your own reviews")
                }
                ReviewError::InvalidRating(e) => format!("Invalid rating: {e}"),
                ReviewError::Repository(_) => "Internal server error".to_string(),
            },
            Self::NotFound(what) => format!("{what} not found"),
            Self::BadRequest(msg) => msg.clone(),
            Self::Unauthorized => "Unauthorized".to_string(),
            // Don't expose internal error details to clients
            Self::Database(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({ "message": self.client_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events on this request with `user`.
pub fn set_sentry_user(user: &CurrentUser) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("purchase", "Reserved stock", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use tradepost_core::{Rating, UserId};

    use super::*;
    use crate::services::ownership::NotOwner;

    async fn render(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body["message"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_out_of_stock_message() {
        let (status, message) =
            render(PurchaseError::OutOfStock { available: 2 }.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Insufficient stock. Only 2 units available.");
    }

    #[tokio::test]
    async fn test_not_owner_messages() {
        let source = NotOwner {
            kind: "review",
            owner: UserId::new(1),
            actor: UserId::new(2),
        };
        let (status, message) = render(
            ReviewError::NotOwner {
                action: "edit",
                source: source.clone(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, "You can only edit your own reviews");

        let (_, message) = render(
            ReviewError::NotOwner {
                action: "delete",
                source,
            }
            .into(),
        )
        .await;
        assert_eq!(message, "You can only delete your own reviews");
    }

    #[tokio::test]
    async fn test_signin_failures_look_identical() {
        let a = render(AuthError::UserNotFound.into()).await;
        let b = render(AuthError::InvalidCredentials.into()).await;
        assert_eq!(a, b);
        assert_eq!(a.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, message) = render(
            RepositoryError::DataCorruption("product 3 has negative stock".to_string()).into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[tokio::test]
    async fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::NotFound("Product".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(ReviewError::InvalidRating(Rating::new(9).unwrap_err())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PurchaseError::ProductNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_not_found_message() {
        let (_, message) = render(AppError::NotFound("Product".to_string())).await;
        assert_eq!(message, "Product not found");
    }
}
