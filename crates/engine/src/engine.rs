//! The storefront facade.
//!
//! [`Storefront`] is constructed once at start-up and owns every store. It is
//! the only thing a presentation layer talks to: it exposes the [`CartView`]
//! read model, the cart and wishlist operations, and the single
//! [`checkout`](Storefront::checkout) entry point.
//!
//! Cart and wishlist remain independent stores; the facade is where the few
//! cross-store steps (move-to-cart, clearing the cart after an order) live.

use std::sync::Arc;

use cartwheel_core::{
    Coupon, CurrencyCode, LineItem, OrderRequest, Price, Product, ProductId, WishlistEntry,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cart::{CartError, CartStorage, CartStore, FileCartStorage};
use crate::checkout::{CheckoutReceipt, SyncReconciler};
use crate::config::EngineConfig;
use crate::coupon::{CouponError, CouponResolver};
use crate::error::{EngineError, Result};
use crate::notify::{Notice, Notifier};
use crate::pricing::{PriceRules, PriceSummary};
use crate::remote::{ApiError, CartApi, HttpCommerceClient, OrderApi, WishlistApi};
use crate::wishlist::{WishlistStore, WishlistSync};

/// Everything the presentation layer renders for the cart.
///
/// Built fresh on every call; nothing here is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub applied_coupon: Option<Coupon>,
    pub summary: PriceSummary,
    pub item_count: u64,
    pub currency: CurrencyCode,
}

impl CartView {
    /// Amount due, with currency.
    #[must_use]
    pub const fn total(&self) -> Price {
        Price::new(self.summary.total, self.currency)
    }

    /// Format any amount from this view in its currency.
    #[must_use]
    pub fn price(&self, amount: rust_decimal::Decimal) -> Price {
        Price::new(amount, self.currency)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Facade over the cart, wishlist, coupon and checkout components.
pub struct Storefront<A, S> {
    cart: CartStore<S>,
    wishlist: WishlistStore<A>,
    coupons: CouponResolver<A>,
    reconciler: SyncReconciler<A>,
    rules: PriceRules,
    currency: CurrencyCode,
    notifier: Notifier,
}

impl Storefront<HttpCommerceClient, FileCartStorage> {
    /// Wire the facade to the HTTP client and the file-backed cart record.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(config: &EngineConfig, notifier: Notifier) -> std::result::Result<Self, ApiError> {
        let api = Arc::new(HttpCommerceClient::new(&config.api)?);
        let storage = FileCartStorage::in_dir(&config.data_dir);
        Ok(Self::new(api, storage, notifier)
            .with_pricing(config.pricing)
            .with_currency(config.currency))
    }
}

impl<A, S> Storefront<A, S>
where
    A: CartApi + WishlistApi + OrderApi,
    S: CartStorage,
{
    /// Open the cart from `storage` and share `api` between the remote-facing
    /// components.
    pub fn new(api: Arc<A>, storage: S, notifier: Notifier) -> Self {
        Self {
            cart: CartStore::open(storage, notifier.clone()),
            wishlist: WishlistStore::new(Arc::clone(&api), notifier.clone()),
            coupons: CouponResolver::new(Arc::clone(&api)),
            reconciler: SyncReconciler::new(api),
            rules: PriceRules::default(),
            currency: CurrencyCode::default(),
            notifier,
        }
    }

    #[must_use]
    pub fn with_pricing(mut self, rules: PriceRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = currency;
        self
    }

    /// Subscribe to user-visible notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore<S> {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistStore<A> {
        &self.wishlist
    }

    #[must_use]
    pub const fn rules(&self) -> &PriceRules {
        &self.rules
    }

    /// Current cart read model.
    #[must_use]
    pub fn view(&self) -> CartView {
        CartView {
            items: self.cart.items().to_vec(),
            applied_coupon: self.cart.applied_coupon().cloned(),
            summary: self.cart.summary(&self.rules),
            item_count: self.cart.total_quantity(),
            currency: self.currency,
        }
    }

    // =========================================================================
    // Cart (optimistic, local only)
    // =========================================================================

    /// See [`CartStore::add_item`].
    ///
    /// # Errors
    ///
    /// Returns `CartError` for a zero quantity or an out-of-stock product.
    pub fn add_to_cart(&mut self, product: Product, quantity: u32) -> std::result::Result<u32, CartError> {
        self.cart.add_item(product, quantity)
    }

    pub fn remove_from_cart(&mut self, product_id: &ProductId) -> Option<LineItem> {
        self.cart.remove_item(product_id)
    }

    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Option<u32> {
        self.cart.update_quantity(product_id, quantity)
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Validate `code` remotely against the current cart and apply it.
    ///
    /// # Errors
    ///
    /// Returns `CouponError`; the cart is untouched in that case.
    pub async fn apply_coupon(
        &mut self,
        code: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Coupon, CouponError> {
        match self.coupons.validate(code, self.cart.items(), cancel).await {
            Ok(coupon) => {
                self.cart.apply_coupon(coupon.clone());
                self.notifier
                    .success(format!("Coupon {} applied", coupon.code));
                Ok(coupon)
            }
            Err(e) => {
                if !matches!(e, CouponError::Cancelled) {
                    self.notifier.error(e.user_message());
                }
                Err(e)
            }
        }
    }

    /// Unapply the cart's coupon remotely, then locally.
    ///
    /// # Errors
    ///
    /// Returns `CouponError`; the coupon stays applied in that case.
    pub async fn remove_coupon(
        &mut self,
        cancel: &CancellationToken,
    ) -> std::result::Result<Option<Coupon>, CouponError> {
        let Some(code) = self.cart.applied_coupon().map(|c| c.code.clone()) else {
            return Ok(None);
        };

        if let Err(e) = self.coupons.remove(&code, cancel).await {
            if !matches!(e, CouponError::Cancelled) {
                self.notifier.error(e.user_message());
            }
            return Err(e);
        }
        self.notifier.info(format!("Coupon {code} removed"));
        Ok(self.cart.remove_coupon())
    }

    // =========================================================================
    // Wishlist (pessimistic)
    // =========================================================================

    /// Refresh the wishlist cache.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Cancelled` only; remote failures reset the cache.
    pub async fn fetch_wishlist(&mut self, cancel: &CancellationToken) -> Result<WishlistSync> {
        self.wishlist.fetch(cancel).await
    }

    /// # Errors
    ///
    /// See [`WishlistStore::add`].
    pub async fn add_to_wishlist(&mut self, product: &Product, cancel: &CancellationToken) -> Result<()> {
        self.wishlist.add(product, cancel).await
    }

    /// # Errors
    ///
    /// See [`WishlistStore::remove`].
    pub async fn remove_from_wishlist(
        &mut self,
        product_id: &ProductId,
        cancel: &CancellationToken,
    ) -> Result<Option<WishlistEntry>> {
        self.wishlist.remove(product_id, cancel).await
    }

    /// # Errors
    ///
    /// See [`WishlistStore::clear`].
    pub async fn clear_wishlist(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.wishlist.clear(cancel).await
    }

    /// Move a saved product to the remote cart, drop it from the wishlist
    /// cache, and add one unit of it to the local cart.
    ///
    /// The local add is skipped when the product was not in the cache, since
    /// there is no product data to add.
    ///
    /// # Errors
    ///
    /// See [`WishlistStore::move_to_cart`]. A local add that fails validation
    /// is reported as a notice, not an error; the move already happened.
    pub async fn move_to_cart(
        &mut self,
        product_id: &ProductId,
        cancel: &CancellationToken,
    ) -> Result<Option<WishlistEntry>> {
        let moved = self.wishlist.move_to_cart(product_id, cancel).await?;
        if let Some(entry) = &moved {
            if let Err(e) = self.cart.add_item(entry.product.clone(), 1) {
                warn!(product_id = %product_id, error = %e, "Moved product not added to local cart");
            }
        }
        Ok(moved)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Reconcile the remote cart with the local one and place the order.
    ///
    /// The local cart is cleared only after the service confirms the order.
    /// On any failure it is left exactly as it was.
    ///
    /// # Errors
    ///
    /// See [`SyncReconciler::checkout`].
    pub async fn checkout(
        &mut self,
        request: &OrderRequest,
        cancel: &CancellationToken,
    ) -> Result<CheckoutReceipt> {
        let items = self.cart.items().to_vec();
        match self.reconciler.checkout(&items, request, cancel).await {
            Ok(receipt) => {
                self.cart.clear();
                info!(order_number = %receipt.confirmation.order_number, "Local cart cleared after order");
                self.notifier.success(format!(
                    "Order {} placed",
                    receipt.confirmation.order_number
                ));
                Ok(receipt)
            }
            Err(e) => {
                if !matches!(e, EngineError::Cancelled) {
                    self.notifier.error(e.user_message());
                }
                Err(e)
            }
        }
    }
}
