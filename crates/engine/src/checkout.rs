//! Checkout-time reconciliation of the remote cart.
//!
//! The local cart is authoritative until the shopper places an order. At that
//! point the remote cart is rebuilt from it:
//!
//! 1. Clear the remote cart ("not found" counts as cleared)
//! 2. Replay each local line, one at a time, in cart order
//! 3. Create the order
//!
//! Steps 1 and 2 are not transactional on the service side. A failure during
//! replay triggers a compensating clear so the remote cart never keeps a
//! partial copy, then the error surfaces and no order is created. The local
//! cart is never modified here; the caller clears it once an order exists.

use std::sync::Arc;

use cartwheel_core::{LineItem, OrderConfirmation, OrderRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{EngineError, ReconcileStage, Result};
use crate::remote::{ApiError, CartApi, OrderApi, until_cancelled};

/// A placed order together with the attempt that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    /// Sent as the order's idempotency key.
    pub attempt_id: Uuid,
    pub confirmation: OrderConfirmation,
}

/// Reject a checkout before any remote call is made.
///
/// # Errors
///
/// Returns `EngineError::Validation` for an empty cart, an incomplete
/// shipping address, or a line whose quantity exceeds stock.
pub fn prevalidate(items: &[LineItem], request: &OrderRequest) -> Result<()> {
    if items.is_empty() {
        return Err(EngineError::Validation("Your cart is empty".to_string()));
    }

    let missing = request.shipping_address.missing_fields();
    if !missing.is_empty() {
        return Err(EngineError::Validation(format!(
            "Shipping address is missing: {}",
            missing.join(", ")
        )));
    }

    if let Some(item) = items.iter().find(|item| item.quantity > item.stock) {
        return Err(EngineError::Validation(format!(
            "Only {} of {} available",
            item.stock, item.name
        )));
    }

    Ok(())
}

/// Runs the clear/replay/order protocol against the remote service.
#[derive(Debug)]
pub struct SyncReconciler<A> {
    api: Arc<A>,
}

impl<A: CartApi + OrderApi> SyncReconciler<A> {
    pub const fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Rebuild the remote cart from `items` and place the order.
    ///
    /// `cancel` is honoured until the order request is issued. Order creation
    /// is irreversible and always runs to completion once started.
    ///
    /// # Errors
    ///
    /// - `Validation` if [`prevalidate`] fails
    /// - `Reconciliation` if the remote cart could not be rebuilt
    /// - `OrderFailed` if the service refused the order
    /// - `Cancelled` if `cancel` fired before the order was requested
    #[instrument(skip_all, fields(attempt_id = tracing::field::Empty, items = items.len()))]
    pub async fn checkout(
        &self,
        items: &[LineItem],
        request: &OrderRequest,
        cancel: &CancellationToken,
    ) -> Result<CheckoutReceipt> {
        prevalidate(items, request)?;

        let attempt_id = Uuid::new_v4();
        tracing::Span::current().record("attempt_id", tracing::field::display(attempt_id));

        self.reconcile(items, cancel).await?;

        if cancel.is_cancelled() {
            info!("Checkout cancelled before order creation");
            return Err(EngineError::Cancelled);
        }

        let key = attempt_id.to_string();
        let confirmation = self
            .api
            .create_order(request, &key)
            .await
            .map_err(|e| {
                error!(error = %e, "Order creation failed");
                EngineError::OrderFailed(e)
            })?;

        info!(
            order_id = %confirmation.order_id,
            order_number = %confirmation.order_number,
            "Order placed"
        );
        Ok(CheckoutReceipt {
            attempt_id,
            confirmation,
        })
    }

    /// Make the remote cart hold exactly `items`.
    ///
    /// # Errors
    ///
    /// Returns `Reconciliation` on any non-benign remote failure, or
    /// `Cancelled`. If replay had started, the remote cart is cleared again
    /// before returning.
    pub async fn reconcile(&self, items: &[LineItem], cancel: &CancellationToken) -> Result<()> {
        match until_cancelled(cancel, self.api.clear_cart()).await {
            None => return Err(EngineError::Cancelled),
            Some(Ok(())) => debug!("Remote cart cleared"),
            Some(Err(e)) if e.is_not_found() => debug!("No remote cart to clear"),
            Some(Err(e)) => {
                error!(error = %e, "Failed to clear remote cart");
                return Err(EngineError::Reconciliation {
                    stage: ReconcileStage::ClearRemoteCart,
                    source: e,
                    rolled_back: false,
                });
            }
        }

        for (index, item) in items.iter().enumerate() {
            match until_cancelled(cancel, self.api.add_cart_item(&item.id, item.quantity)).await {
                Some(Ok(())) => {
                    debug!(product_id = %item.id, quantity = item.quantity, "Replayed cart item");
                }
                None => {
                    info!(replayed = index, "Checkout cancelled during replay");
                    self.roll_back().await;
                    return Err(EngineError::Cancelled);
                }
                Some(Err(e)) => {
                    error!(
                        product_id = %item.id,
                        replayed = index,
                        error = %e,
                        "Failed to replay cart item"
                    );
                    let rolled_back = self.roll_back().await;
                    return Err(EngineError::Reconciliation {
                        stage: ReconcileStage::ReplayItem,
                        source: e,
                        rolled_back,
                    });
                }
            }
        }

        Ok(())
    }

    /// Compensating clear after a partial replay. Not cancellable.
    async fn roll_back(&self) -> bool {
        match self.api.clear_cart().await {
            Ok(()) => true,
            Err(ApiError::NotFound(_)) => true,
            Err(e) => {
                warn!(error = %e, "Rollback clear failed, remote cart holds a partial copy");
                false
            }
        }
    }
}
