//! The authoritative local cart.
//!
//! Mutations are optimistic: they apply immediately, never wait on the
//! network, and are written to durable storage before returning. The remote
//! cart only becomes relevant at checkout (see [`crate::checkout`]).
//!
//! The store owns the `1 <= quantity <= stock` invariant. Callers may pass any
//! quantity; the store clamps to the remote-reported stock ceiling and tells
//! the shopper when it did.

mod storage;

pub use storage::{
    CART_STORAGE_KEY, CartSnapshot, CartStorage, FileCartStorage, MemoryCartStorage,
    SNAPSHOT_VERSION, StorageError,
};

use std::collections::HashSet;

use cartwheel_core::{Coupon, LineItem, Product, ProductId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::notify::Notifier;
use crate::pricing::{self, PriceRules, PriceSummary};

/// Local validation failures. The cart is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

/// The shopper's cart: ordered line items unique by product id, plus an
/// optional coupon.
#[derive(Debug)]
pub struct CartStore<S> {
    items: Vec<LineItem>,
    applied_coupon: Option<Coupon>,
    storage: S,
    notifier: Notifier,
}

impl<S: CartStorage> CartStore<S> {
    /// Open the cart, hydrating from the durable record in one bulk load.
    ///
    /// A missing record yields an empty cart. An unreadable one is logged and
    /// also yields an empty cart; it is overwritten by the next mutation.
    pub fn open(storage: S, notifier: Notifier) -> Self {
        let mut store = Self {
            items: Vec::new(),
            applied_coupon: None,
            storage,
            notifier,
        };
        match store.storage.load() {
            Ok(Some(snapshot)) => store.hydrate(snapshot),
            Ok(None) => debug!("No saved cart, starting empty"),
            Err(e) => warn!(error = %e, "Saved cart is unreadable, starting empty"),
        }
        store
    }

    /// Replace in-memory state with a saved snapshot.
    ///
    /// Assigns directly: no notifications, no merge logic, no write-back.
    /// Duplicate ids keep their first occurrence, lines with no quantity or no
    /// stock are dropped, and quantities above the saved stock are clamped.
    pub fn hydrate(&mut self, snapshot: CartSnapshot) {
        let mut seen = HashSet::new();
        let before = snapshot.items.len();
        let mut clamped = 0_usize;
        self.items = snapshot
            .items
            .into_iter()
            .filter(|item| item.quantity > 0 && item.stock > 0 && seen.insert(item.id.clone()))
            .map(|mut item| {
                if item.quantity > item.stock {
                    item.quantity = item.stock;
                    clamped += 1;
                }
                item
            })
            .collect();
        self.applied_coupon = snapshot.applied_coupon;

        if self.items.len() != before || clamped > 0 {
            warn!(
                kept = self.items.len(),
                dropped = before - self.items.len(),
                clamped,
                "Repaired invalid entries from saved cart"
            );
        }
        debug!(items = self.items.len(), "Cart hydrated");
    }

    // =========================================================================
    // Read model
    // =========================================================================

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub const fn applied_coupon(&self) -> Option<&Coupon> {
        self.applied_coupon.as_ref()
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Fresh price computation over the current state.
    #[must_use]
    pub fn summary(&self, rules: &PriceRules) -> PriceSummary {
        pricing::calculate(&self.items, self.applied_coupon.as_ref(), rules)
    }

    /// Copy of the state as it is persisted.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::new(self.items.clone(), self.applied_coupon.clone())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`, merging with an existing line.
    ///
    /// Returns the line's resulting quantity, which is clamped to stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if `quantity` is zero or the product has no stock.
    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            self.notifier.warning("Quantity must be at least 1");
            return Err(CartError::InvalidQuantity);
        }
        if !product.in_stock() {
            self.notifier.warning(format!("{} is out of stock", product.name));
            return Err(CartError::OutOfStock { name: product.name });
        }

        let stock = product.stock;
        let (name, requested, result) =
            if let Some(existing) = self.items.iter_mut().find(|item| item.id == product.id) {
                // Stock is remote-reported; take the freshest figure.
                existing.stock = stock;
                let requested = existing.quantity.saturating_add(quantity);
                existing.quantity = requested.min(stock);
                (existing.name.clone(), requested, existing.quantity)
            } else {
                let item = LineItem::from_product(product, quantity.min(stock));
                let entry = (item.name.clone(), quantity, item.quantity);
                self.items.push(item);
                entry
            };

        debug!(product = %name, quantity = result, "Cart item added");
        if result < requested {
            self.notifier
                .warning(format!("Only {stock} of {name} available, quantity adjusted"));
        } else {
            self.notifier.success(format!("Added {name} to cart"));
        }
        self.persist();
        Ok(result)
    }

    /// Remove a line. No-op when absent.
    pub fn remove_item(&mut self, id: &ProductId) -> Option<LineItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        let removed = self.items.remove(index);

        debug!(product = %removed.name, "Cart item removed");
        self.notifier
            .success(format!("Removed {} from cart", removed.name));
        self.persist();
        Some(removed)
    }

    /// Set a line's quantity. Zero removes the line; larger values are
    /// clamped to stock. A line whose stock has run out is removed.
    ///
    /// Returns the line's resulting quantity, or `None` if the line is gone.
    pub fn update_quantity(&mut self, id: &ProductId, new_quantity: u32) -> Option<u32> {
        if new_quantity == 0 {
            self.remove_item(id);
            return None;
        }

        let item = self.items.iter_mut().find(|item| &item.id == id)?;
        let ceiling = item.stock;
        if ceiling == 0 {
            let name = item.name.clone();
            self.items.retain(|item| &item.id != id);
            debug!(product = %name, "Out of stock cart item removed");
            self.notifier.warning(format!("{name} is out of stock"));
            self.persist();
            return None;
        }
        let quantity = new_quantity.min(ceiling);
        let clamped = quantity < new_quantity;
        let name = item.name.clone();
        item.quantity = quantity;

        debug!(product = %name, quantity, "Cart quantity updated");
        if clamped {
            self.notifier
                .warning(format!("Only {ceiling} of {name} available, quantity adjusted"));
        }
        self.persist();
        Some(quantity)
    }

    /// Empty the cart. The applied coupon goes with the items it was computed
    /// against.
    pub fn clear(&mut self) {
        self.items.clear();
        self.applied_coupon = None;
        debug!("Cart cleared");
        self.persist();
    }

    /// Store a coupon the resolver has already validated.
    pub fn apply_coupon(&mut self, coupon: Coupon) {
        debug!(code = %coupon.code, "Coupon applied");
        self.applied_coupon = Some(coupon);
        self.persist();
    }

    /// Drop the applied coupon.
    pub fn remove_coupon(&mut self) -> Option<Coupon> {
        let removed = self.applied_coupon.take();
        if removed.is_some() {
            debug!("Coupon removed");
            self.persist();
        }
        removed
    }

    /// Write the whole state. Failures leave memory authoritative.
    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.snapshot()) {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}
