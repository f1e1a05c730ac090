//! Purchase flow: reserve stock, then append the purchase record.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument};

use tradepost_core::{ProductId, Quantity};

use crate::db::{InventoryLedger, PurchaseRecorder, RepositoryError, Reservation};
use crate::models::{CurrentUser, Purchase};

/// Errors from the purchase flow.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("product not found")]
    ProductNotFound,

    /// Business rejection, not a fault.
    #[error("insufficient stock: {available} available")]
    OutOfStock { available: i32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Orchestrates the reservation and the purchase record.
///
/// The two steps are separate storage calls. If recording fails after a
/// successful reservation the stock stays decremented with no purchase row;
/// that case is logged at error level with enough detail to reconcile by
/// hand.
pub struct PurchaseService<'a> {
    inventory: &'a Arc<dyn InventoryLedger>,
    purchases: &'a Arc<dyn PurchaseRecorder>,
}

impl<'a> PurchaseService<'a> {
    #[must_use]
    pub const fn new(
        inventory: &'a Arc<dyn InventoryLedger>,
        purchases: &'a Arc<dyn PurchaseRecorder>,
    ) -> Self {
        Self {
            inventory,
            purchases,
        }
    }

    /// Buy `quantity` units of `product` on behalf of `buyer`.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::ProductNotFound`, `PurchaseError::OutOfStock`,
    /// or `PurchaseError::Repository` on storage failure. Nothing is retried.
    #[instrument(skip(self, buyer), fields(user = %buyer.id))]
    pub async fn purchase(
        &self,
        buyer: &CurrentUser,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Purchase, PurchaseError> {
        let remaining = match self.inventory.reserve(product, quantity).await? {
            Reservation::Reserved { remaining } => remaining,
            Reservation::OutOfStock { available } => {
                return Err(PurchaseError::OutOfStock { available });
            }
            Reservation::NotFound => return Err(PurchaseError::ProductNotFound),
        };

        match self.purchases.record(buyer.id, product, quantity).await {
            Ok(purchase) => {
                info!(purchase = %purchase.id, remaining, "purchase recorded");
                Ok(purchase)
            }
            Err(e) => {
                error!(
                    user = %buyer.id,
                    product = %product,
                    quantity = %quantity,
                    error = %e,
                    "stock reserved but purchase record failed"
                );
                Err(e.into())
            }
        }
    }
}
