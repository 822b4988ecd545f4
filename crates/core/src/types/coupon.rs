//! Cart-level discount rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` percent of the subtotal.
    Percentage,
    /// `discount_value` off the subtotal.
    Flat,
}

/// A named discount rule applied to the whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub description: String,
}

impl Coupon {
    /// Whether the rule is well-formed: non-negative, and at most 100 for percentages.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if self.discount_value.is_sign_negative() {
            return false;
        }
        match self.discount_type {
            DiscountType::Percentage => self.discount_value <= Decimal::ONE_HUNDRED,
            DiscountType::Flat => true,
        }
    }
}
