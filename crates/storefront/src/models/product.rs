//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradepost_core::{Price, ProductId};

/// A catalog entry.
///
/// `stock` is never negative; it only decreases through
/// `InventoryLedger::reserve`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub stock: i32,
}

/// Which slice of the catalog to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockFilter {
    /// Every product.
    #[default]
    All,
    /// Products with `stock > 0`.
    Available,
    /// Products with `stock = 0`.
    Unavailable,
}

impl StockFilter {
    /// Whether a product with the given stock belongs in this slice.
    #[must_use]
    pub const fn matches(self, stock: i32) -> bool {
        match self {
            Self::All => true,
            Self::Available => stock > 0,
            Self::Unavailable => stock == 0,
        }
    }
}
