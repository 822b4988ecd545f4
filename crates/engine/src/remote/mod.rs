//! Remote commerce service boundary.
//!
//! # Architecture
//!
//! - The remote service is the source of truth for the wishlist and, at
//!   checkout, for the cart and the order
//! - Stores depend on the [`CartApi`], [`WishlistApi`] and [`OrderApi`]
//!   traits, never on HTTP directly
//! - [`HttpCommerceClient`] implements all three with `reqwest`
//!
//! # Example
//!
//! ```rust,ignore
//! use cartwheel_engine::remote::{CartApi, HttpCommerceClient};
//!
//! let client = HttpCommerceClient::new(&config.api)?;
//! client.clear_cart().await?;
//! client.add_cart_item(&product_id, 2).await?;
//! ```

mod client;
mod wire;

pub use client::HttpCommerceClient;
pub use wire::CouponLine;

use std::future::Future;

use cartwheel_core::{Coupon, OrderConfirmation, OrderRequest, ProductId, WishlistEntry};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can occur when talking to the remote commerce service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with an unexpected status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Shopper is not signed in, or the session expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// Service refused the request (invalid input, ineligible cart, ...).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether the service reported that the target does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Unauthorized | Self::Rejected(_) | Self::Parse(_) => false,
        }
    }
}

/// Remote cart endpoints.
pub trait CartApi: Send + Sync {
    /// Add `quantity` units of a product to the remote cart.
    fn add_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Empty the remote cart. Reports [`ApiError::NotFound`] when no cart exists.
    fn clear_cart(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Validate a coupon code against a snapshot of the cart.
    fn apply_coupon(
        &self,
        code: &str,
        items: &[CouponLine],
    ) -> impl Future<Output = Result<Coupon, ApiError>> + Send;

    /// Unapply the cart's coupon.
    fn remove_coupon(&self, code: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Remote wishlist endpoints.
pub trait WishlistApi: Send + Sync {
    /// Fetch the full wishlist.
    fn get_wishlist(&self) -> impl Future<Output = Result<Vec<WishlistEntry>, ApiError>> + Send;

    /// Save a product. Saving one that is already saved is not an error.
    ///
    /// Returns the stored entry, or `None` if the service confirmed without
    /// echoing it back.
    fn add_to_wishlist(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<Option<WishlistEntry>, ApiError>> + Send;

    /// Remove a saved product.
    fn remove_from_wishlist(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove every saved product.
    fn clear_wishlist(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Move a saved product into the remote cart.
    fn move_to_cart(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Remote order endpoint.
pub trait OrderApi: Send + Sync {
    /// Create an order from the remote cart's contents.
    ///
    /// `idempotency_key` identifies the checkout attempt.
    fn create_order(
        &self,
        request: &OrderRequest,
        idempotency_key: &str,
    ) -> impl Future<Output = Result<OrderConfirmation, ApiError>> + Send;
}

/// Race a remote call against `cancel`.
///
/// Returns `None` if the token fired first. The call's future is dropped at
/// that point, so its response can never reach local state.
pub async fn until_cancelled<F: Future>(cancel: &CancellationToken, call: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        output = call => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("cart".to_string());
        assert_eq!(err.to_string(), "Not found: cart");

        let err = ApiError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 502 - bad gateway");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::RateLimited(5).is_retryable());
        assert!(
            ApiError::Api {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ApiError::Api {
                status: 409,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!ApiError::Rejected("expired".to_string()).is_retryable());
        assert!(!ApiError::Unauthorized.is_retryable());
    }

    #[test]
    fn test_not_found_is_only_not_found() {
        assert!(ApiError::NotFound("cart".to_string()).is_not_found());
        assert!(!ApiError::Rejected("cart".to_string()).is_not_found());
    }

    #[tokio::test]
    async fn test_until_cancelled_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(until_cancelled(&cancel, async { 7 }).await, None);
    }

    #[tokio::test]
    async fn test_until_cancelled_drops_pending_call() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let pending = tokio::time::sleep(Duration::from_secs(30));
        assert_eq!(until_cancelled(&cancel, pending).await, None);
    }

    #[tokio::test]
    async fn test_until_cancelled_passes_output_through() {
        let cancel = CancellationToken::new();
        assert_eq!(until_cancelled(&cancel, async { "done" }).await, Some("done"));
    }
}
