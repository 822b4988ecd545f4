//! Price computation for a cart.
//!
//! [`calculate`] is a pure function of the line items, the applied coupon and
//! the shipping rules. It holds no cache; callers compute a fresh
//! [`PriceSummary`] whenever the cart changes.

use cartwheel_core::{Coupon, DiscountType, LineItem};
use rust_decimal::Decimal;
use serde::Serialize;

/// Shipping rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRules {
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Flat fee charged below the threshold.
    pub shipping_fee: Decimal,
}

impl PriceRules {
    pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(2000, 0, 0, false, 0);
    pub const DEFAULT_SHIPPING_FEE: Decimal = Decimal::from_parts(150, 0, 0, false, 0);

    /// Shipping fee for a given subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.shipping_fee
        }
    }
}

impl Default for PriceRules {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Self::DEFAULT_FREE_SHIPPING_THRESHOLD,
            shipping_fee: Self::DEFAULT_SHIPPING_FEE,
        }
    }
}

/// Display values derived from a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub savings: Decimal,
}

/// Compute subtotal, shipping, discount, total and savings.
///
/// Arithmetic saturates at the `Decimal` bounds instead of panicking.
#[must_use]
pub fn calculate(items: &[LineItem], coupon: Option<&Coupon>, rules: &PriceRules) -> PriceSummary {
    let subtotal = saturating_sum(items.iter().map(LineItem::line_total));
    let shipping = rules.shipping_for(subtotal);
    let discount = coupon.map_or(Decimal::ZERO, |c| discount_for(c, subtotal));
    let total = subtotal
        .saturating_add(shipping)
        .saturating_sub(discount)
        .max(Decimal::ZERO);
    let savings = saturating_sum(items.iter().map(LineItem::savings));

    PriceSummary {
        subtotal,
        shipping,
        discount,
        total,
        savings,
    }
}

/// Discount a coupon grants on `subtotal`, clipped to `[0, subtotal]`.
#[must_use]
pub fn discount_for(coupon: &Coupon, subtotal: Decimal) -> Decimal {
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            subtotal.saturating_mul(coupon.discount_value) / Decimal::ONE_HUNDRED
        }
        DiscountType::Flat => coupon.discount_value,
    };
    raw.clamp(Decimal::ZERO, subtotal.max(Decimal::ZERO))
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}
