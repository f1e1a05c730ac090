//! Catalog and purchase route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tradepost_core::{Price, ProductId, Quantity};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::{NewProduct, Product, Purchase, StockFilter};
use crate::services::purchases::PurchaseService;
use crate::state::AppState;

/// Product creation request body.
///
/// `price` accepts a JSON number or a decimal string and must not be negative.
#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    pub stock: i64,
}

/// Product creation response body.
#[derive(Serialize)]
pub struct CreateProductResponse {
    pub message: String,
    pub product: Product,
}

/// Purchase request body. The quantity is validated by the handler so the
/// error message can be specific.
#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub quantity: i64,
}

/// Purchase response body.
#[derive(Serialize)]
pub struct PurchaseResponse {
    pub message: String,
    pub purchase: Purchase,
}

async fn list(state: &AppState, filter: StockFilter) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.repos().products.list(filter).await?))
}

/// Every product.
pub async fn all(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    list(&state, StockFilter::All).await
}

/// Products with stock left.
pub async fn available(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    list(&state, StockFilter::Available).await
}

/// Sold-out products.
pub async fn unavailable(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    list(&state, StockFilter::Unavailable).await
}

/// One product by id.
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    state
        .repos()
        .products
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Add a product to the catalog.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<CreateProductResponse>)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }

    let stock = i32::try_from(body.stock)
        .ok()
        .filter(|s| *s >= 0)
        .ok_or_else(|| AppError::BadRequest("Stock must be a non-negative integer".to_string()))?;

    let product = state
        .repos()
        .products
        .create(&NewProduct {
            name: name.to_string(),
            description: body.description,
            price: body.price,
            stock,
        })
        .await?;

    tracing::info!(product = %product.id, stock, "product created");

    Ok((
        StatusCode::CREATED,
        Json(CreateProductResponse {
            message: "Product created successfully".to_string(),
            product,
        }),
    ))
}

/// Buy units of a product as the token's user.
#[instrument(skip_all, fields(product = %id))]
pub async fn purchase(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>)> {
    let quantity = Quantity::new(body.quantity)
        .map_err(|e| AppError::BadRequest(format!("Invalid quantity: {e}")))?;

    let repos = state.repos();
    let purchase = PurchaseService::new(&repos.inventory, &repos.purchases)
        .purchase(&user, id, quantity)
        .await?;

    let product_id = id.to_string();
    let units = quantity.to_string();
    add_breadcrumb(
        "purchase",
        "Purchase recorded",
        Some(&[("product_id", product_id.as_str()), ("quantity", units.as_str())]),
    );

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            message: "Purchase successful".to_string(),
            purchase,
        }),
    ))
}
