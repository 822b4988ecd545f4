//! Remote coupon validation.
//!
//! [`CouponResolver`] is a service boundary only. It never touches the cart;
//! the caller hands a validated [`Coupon`] to
//! [`CartStore::apply_coupon`](crate::cart::CartStore::apply_coupon).

use std::sync::Arc;

use cartwheel_core::{Coupon, LineItem};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::remote::{ApiError, CartApi, CouponLine, until_cancelled};

/// Why a coupon could not be applied or removed.
#[derive(Debug, Error)]
pub enum CouponError {
    /// Unknown code, expired, or the cart is not eligible. Not retryable.
    #[error("{0}")]
    Invalid(String),

    /// The service could not be asked. Retrying may succeed.
    #[error("Coupon service unavailable: {0}")]
    Unavailable(#[source] ApiError),

    #[error("Coupon request cancelled")]
    Cancelled,
}

impl CouponError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Cancelled)
    }

    /// Message suitable for a transient notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(msg) => msg.clone(),
            Self::Unavailable(ApiError::Unauthorized) => {
                "Please sign in to use coupons".to_string()
            }
            Self::Unavailable(_) => "Could not check the coupon, please try again".to_string(),
            Self::Cancelled => "Cancelled".to_string(),
        }
    }
}

impl From<ApiError> for CouponError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected(msg) => Self::Invalid(msg),
            ApiError::NotFound(_) => Self::Invalid("Invalid coupon code".to_string()),
            other => Self::Unavailable(other),
        }
    }
}

/// Canonical form of a shopper-entered code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validates coupon codes against the remote cart endpoints.
#[derive(Debug)]
pub struct CouponResolver<A> {
    api: Arc<A>,
}

impl<A: CartApi> CouponResolver<A> {
    pub const fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Ask the service whether `code` applies to `items`.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Invalid` for empty codes (without a remote call),
    /// codes the service rejects, and malformed rules the service returns.
    #[instrument(skip_all, fields(code = tracing::field::Empty))]
    pub async fn validate(
        &self,
        code: &str,
        items: &[LineItem],
        cancel: &CancellationToken,
    ) -> Result<Coupon, CouponError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(CouponError::Invalid("Please enter a coupon code".to_string()));
        }
        tracing::Span::current().record("code", code.as_str());

        let lines: Vec<CouponLine> = items.iter().map(CouponLine::from).collect();
        let mut coupon = until_cancelled(cancel, self.api.apply_coupon(&code, &lines))
            .await
            .ok_or(CouponError::Cancelled)?
            .map_err(|e| {
                warn!(error = %e, "Coupon validation failed");
                CouponError::from(e)
            })?;

        if !coupon.is_well_formed() {
            warn!(
                discount_type = ?coupon.discount_type,
                discount_value = %coupon.discount_value,
                "Service returned a malformed coupon"
            );
            return Err(CouponError::Invalid(
                "This coupon cannot be applied".to_string(),
            ));
        }
        if coupon.code.trim().is_empty() {
            coupon.code = code;
        }

        debug!("Coupon validated");
        Ok(coupon)
    }

    /// Unapply `code` on the service. A coupon the service no longer knows
    /// about counts as removed.
    ///
    /// # Errors
    ///
    /// Returns `CouponError` if the service refuses or `cancel` fires.
    #[instrument(skip_all, fields(code = %code))]
    pub async fn remove(&self, code: &str, cancel: &CancellationToken) -> Result<(), CouponError> {
        match until_cancelled(cancel, self.api.remove_coupon(code)).await {
            None => Err(CouponError::Cancelled),
            Some(Ok(())) => {
                debug!("Coupon removed remotely");
                Ok(())
            }
            Some(Err(e)) if e.is_not_found() => {
                debug!("No remote coupon to remove");
                Ok(())
            }
            Some(Err(e)) => {
                warn!(error = %e, "Coupon removal failed");
                Err(CouponError::from(e))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use cartwheel_core::{DiscountType, Product, ProductId};
    use rust_decimal::Decimal;

    use super::*;

    /// Cart service answering coupon calls from a canned response.
    struct FakeCoupons {
        response: Mutex<Option<Result<Coupon, ApiError>>>,
        seen: Mutex<Vec<(String, Vec<CouponLine>)>>,
    }

    impl FakeCoupons {
        fn answering(response: Result<Coupon, ApiError>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl CartApi for FakeCoupons {
        async fn add_cart_item(&self, _: &ProductId, _: u32) -> Result<(), ApiError> {
            Ok(())
        }

        async fn clear_cart(&self) -> Result<(), ApiError> {
            Ok(())
        }

        async fn apply_coupon(&self, code: &str, items: &[CouponLine]) -> Result<Coupon, ApiError> {
            self.seen
                .lock()
                .unwrap()
                .push((code.to_string(), items.to_vec()));
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ApiError::Parse("no response scripted".to_string())))
        }

        async fn remove_coupon(&self, _: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        Coupon {
            code: "EID10".to_string(),
            discount_type,
            discount_value: Decimal::from(value),
            description: "Eid offer".to_string(),
        }
    }

    fn items() -> Vec<LineItem> {
        let product = Product {
            id: ProductId::new("p1"),
            name: "Attar".to_string(),
            price: Decimal::from(900),
            original_price: None,
            stock: 10,
            variant: None,
            category: Some("fragrance".to_string()),
            is_authentic: true,
            image: None,
        };
        vec![LineItem::from_product(product, 2)]
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  eid10 "), "EID10");
        assert_eq!(normalize_code("   "), "");
    }

    #[tokio::test]
    async fn test_validate_sends_normalized_code_and_snapshot() {
        let api = FakeCoupons::answering(Ok(coupon(DiscountType::Percentage, 10)));
        let resolver = CouponResolver::new(api.clone());

        let applied = resolver
            .validate(" eid10", &items(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(applied.code, "EID10");
        let seen = api.seen.lock().unwrap();
        assert_eq!(seen[0].0, "EID10");
        assert_eq!(seen[0].1[0].quantity, 2);
        assert_eq!(seen[0].1[0].category.as_deref(), Some("fragrance"));
    }

    #[tokio::test]
    async fn test_empty_code_rejected_locally() {
        let api = FakeCoupons::answering(Ok(coupon(DiscountType::Flat, 100)));
        let resolver = CouponResolver::new(api.clone());

        let err = resolver
            .validate("  ", &items(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CouponError::Invalid(_)));
        assert!(api.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_invalid_and_outage_is_retryable() {
        let resolver = CouponResolver::new(FakeCoupons::answering(Err(ApiError::Rejected(
            "Coupon expired".to_string(),
        ))));
        let err = resolver
            .validate("OLD", &items(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Coupon expired");
        assert!(!err.is_retryable());

        let resolver = CouponResolver::new(FakeCoupons::answering(Err(ApiError::RateLimited(3))));
        let err = resolver
            .validate("EID10", &items(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CouponError::Unavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_coupon_rejected() {
        let resolver = CouponResolver::new(FakeCoupons::answering(Ok(coupon(
            DiscountType::Percentage,
            150,
        ))));
        let err = resolver
            .validate("EID10", &items(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CouponError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_cancelled_validation() {
        let resolver = CouponResolver::new(FakeCoupons::answering(Ok(coupon(
            DiscountType::Flat,
            50,
        ))));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resolver.validate("EID10", &items(), &cancel).await.unwrap_err();
        assert!(matches!(err, CouponError::Cancelled));
    }
}
