//! In-memory commerce service.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cartwheel_core::{
    Coupon, OrderConfirmation, OrderId, OrderRequest, Product, ProductId, WishlistEntry,
};
use cartwheel_engine::remote::{ApiError, CartApi, CouponLine, OrderApi, WishlistApi};
use chrono::Utc;
use rust_decimal::Decimal;

/// A call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ClearCart,
    AddCartItem(ProductId, u32),
    ApplyCoupon(String),
    RemoveCoupon(String),
    GetWishlist,
    AddToWishlist(ProductId),
    RemoveFromWishlist(ProductId),
    ClearWishlist,
    MoveToCart(ProductId),
    CreateOrder { idempotency_key: String },
}

impl Call {
    #[must_use]
    pub const fn is_order(&self) -> bool {
        matches!(self, Self::CreateOrder { .. })
    }
}

/// Scripted failure kinds.
#[derive(Debug, Clone)]
pub enum Fail {
    /// Service refused the request.
    Rejected(String),
    /// Service is down (503).
    Unavailable,
    Unauthorized,
    NotFound,
}

impl Fail {
    fn to_error(&self) -> ApiError {
        match self {
            Self::Rejected(msg) => ApiError::Rejected(msg.clone()),
            Self::Unavailable => ApiError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            },
            Self::Unauthorized => ApiError::Unauthorized,
            Self::NotFound => ApiError::NotFound("not found".to_string()),
        }
    }
}

type Matcher = Box<dyn Fn(&Call) -> bool + Send + Sync>;

/// A placed order as the mock saw it.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub request: OrderRequest,
    pub idempotency_key: String,
    pub lines: Vec<(ProductId, u32)>,
    pub confirmation: OrderConfirmation,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    failures: Vec<(Matcher, Fail)>,
    delay: Option<Duration>,
    catalog: HashMap<ProductId, Product>,
    coupons: HashMap<String, Coupon>,
    cart: Option<Vec<(ProductId, u32)>>,
    wishlist: Vec<WishlistEntry>,
    orders: Vec<PlacedOrder>,
}

impl State {
    /// Log the call and apply any matching scripted failure.
    fn enter(&mut self, call: Call) -> Result<(), ApiError> {
        let failure = self
            .failures
            .iter()
            .find(|(matches, _)| matches(&call))
            .map(|(_, fail)| fail.to_error());
        self.calls.push(call);
        failure.map_or(Ok(()), Err)
    }

    fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.catalog
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("product {id}")))
    }

    fn add_to_cart(&mut self, id: &ProductId, quantity: u32) {
        let cart = self.cart.get_or_insert_with(Vec::new);
        match cart.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, q)) => *q += quantity,
            None => cart.push((id.clone(), quantity)),
        }
    }
}

/// Commerce service double implementing every remote trait.
///
/// There is no remote cart until the first item is added, so a first clear
/// reports not found.
#[derive(Default)]
pub struct MockCommerce {
    state: Mutex<State>,
}

impl MockCommerce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a product known to the service.
    #[must_use]
    pub fn with_product(self, product: Product) -> Self {
        self.lock().catalog.insert(product.id.clone(), product);
        self
    }

    /// Accept a coupon code.
    #[must_use]
    pub fn with_coupon(self, coupon: Coupon) -> Self {
        self.lock().coupons.insert(coupon.code.clone(), coupon);
        self
    }

    /// Seed the remote wishlist.
    #[must_use]
    pub fn with_wishlisted(self, product: Product) -> Self {
        {
            let mut state = self.lock();
            state.catalog.insert(product.id.clone(), product.clone());
            state.wishlist.push(WishlistEntry {
                product,
                added_at: Utc::now(),
            });
        }
        self
    }

    /// Seed a remote cart that already holds items.
    #[must_use]
    pub fn with_remote_cart(self, lines: Vec<(ProductId, u32)>) -> Self {
        self.lock().cart = Some(lines);
        self
    }

    /// Delay every call, so tests can cancel while one is in flight.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = Some(delay);
        self
    }

    /// Fail every call `matches` accepts, until [`heal`](Self::heal).
    pub fn fail_when(&self, matches: impl Fn(&Call) -> bool + Send + Sync + 'static, fail: Fail) {
        self.lock().failures.push((Box::new(matches), fail));
    }

    /// Drop all scripted failures.
    pub fn heal(&self) {
        self.lock().failures.clear();
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Remote cart contents, `None` if no cart exists.
    #[must_use]
    pub fn remote_cart(&self) -> Option<Vec<(ProductId, u32)>> {
        self.lock().cart.clone()
    }

    #[must_use]
    pub fn remote_wishlist(&self) -> Vec<ProductId> {
        self.lock()
            .wishlist
            .iter()
            .map(|e| e.product_id().clone())
            .collect()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.lock().orders.clone()
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl CartApi for MockCommerce {
    async fn add_cart_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::AddCartItem(product_id.clone(), quantity))?;
        state.add_to_cart(product_id, quantity);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::ClearCart)?;
        match state.cart.as_mut() {
            Some(cart) => {
                cart.clear();
                Ok(())
            }
            None => Err(ApiError::NotFound("Cart not found".to_string())),
        }
    }

    async fn apply_coupon(&self, code: &str, items: &[CouponLine]) -> Result<Coupon, ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::ApplyCoupon(code.to_string()))?;
        if items.is_empty() {
            return Err(ApiError::Rejected("Add items before applying a coupon".to_string()));
        }
        state
            .coupons
            .get(code)
            .cloned()
            .ok_or_else(|| ApiError::Rejected("Invalid coupon code".to_string()))
    }

    async fn remove_coupon(&self, code: &str) -> Result<(), ApiError> {
        self.pause().await;
        self.lock().enter(Call::RemoveCoupon(code.to_string()))
    }
}

impl WishlistApi for MockCommerce {
    async fn get_wishlist(&self) -> Result<Vec<WishlistEntry>, ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::GetWishlist)?;
        Ok(state.wishlist.clone())
    }

    async fn add_to_wishlist(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<WishlistEntry>, ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::AddToWishlist(product_id.clone()))?;
        let entry = WishlistEntry {
            product: state.product(product_id)?,
            added_at: Utc::now(),
        };
        state.wishlist.retain(|e| e.product_id() != product_id);
        state.wishlist.push(entry.clone());
        Ok(Some(entry))
    }

    async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::RemoveFromWishlist(product_id.clone()))?;
        state.wishlist.retain(|e| e.product_id() != product_id);
        Ok(())
    }

    async fn clear_wishlist(&self) -> Result<(), ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::ClearWishlist)?;
        state.wishlist.clear();
        Ok(())
    }

    async fn move_to_cart(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::MoveToCart(product_id.clone()))?;
        let before = state.wishlist.len();
        state.wishlist.retain(|e| e.product_id() != product_id);
        if state.wishlist.len() == before {
            return Err(ApiError::NotFound(format!("wishlist entry {product_id}")));
        }
        state.add_to_cart(product_id, 1);
        Ok(())
    }
}

impl OrderApi for MockCommerce {
    async fn create_order(
        &self,
        request: &OrderRequest,
        idempotency_key: &str,
    ) -> Result<OrderConfirmation, ApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.enter(Call::CreateOrder {
            idempotency_key: idempotency_key.to_string(),
        })?;

        if let Some(existing) = state
            .orders
            .iter()
            .find(|o| o.idempotency_key == idempotency_key)
        {
            return Ok(existing.confirmation.clone());
        }

        let lines = state.cart.clone().unwrap_or_default();
        if lines.is_empty() {
            return Err(ApiError::Rejected("Cart is empty".to_string()));
        }
        let total_amount = lines
            .iter()
            .map(|(id, quantity)| {
                state
                    .catalog
                    .get(id)
                    .map_or(Decimal::ZERO, |p| p.price * Decimal::from(*quantity))
            })
            .sum();

        let number = state.orders.len() + 1001;
        let confirmation = OrderConfirmation {
            order_id: OrderId::new(format!("ord_{number}")),
            order_number: format!("CW-{number}"),
            total_amount,
            estimated_delivery: Some("2-4 business days".to_string()),
        };
        state.orders.push(PlacedOrder {
            request: request.clone(),
            idempotency_key: idempotency_key.to_string(),
            lines,
            confirmation: confirmation.clone(),
        });
        state.cart = Some(Vec::new());
        Ok(confirmation)
    }
}
