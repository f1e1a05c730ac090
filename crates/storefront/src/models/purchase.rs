//! Purchase record type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradepost_core::{ProductId, PurchaseId, Quantity, UserId};

/// An immutable record of a completed reservation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
}
