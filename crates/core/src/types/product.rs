//! Products as seen by the shopper, and the cart line items built from them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, VariantId};

/// A chosen sub-selection of a product (size, colour, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Remote variant ID, when the service tracks variants separately.
    pub id: Option<VariantId>,
    /// Display label (e.g., "XL / Red").
    pub label: String,
}

/// A product reference as dispatched by the presentation layer.
///
/// Stock is a read-only input reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Current unit price.
    pub price: Decimal,
    /// Pre-discount unit price, used to compute savings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    /// Remote-reported stock ceiling.
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_authentic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    /// Whether any unit can be put in a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// One product (plus chosen variant) and its quantity within the cart.
///
/// `1 <= quantity <= stock` is maintained by the cart store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    pub quantity: u32,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_authentic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItem {
    /// Build a line item for `product` with the given quantity.
    #[must_use]
    pub fn from_product(product: Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            original_price: product.original_price,
            quantity,
            stock: product.stock,
            variant: product.variant,
            category: product.category,
            is_authentic: product.is_authentic,
            image: product.image,
        }
    }

    /// `price * quantity`, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Savings against `original_price`, floored at zero.
    #[must_use]
    pub fn savings(&self) -> Decimal {
        self.original_price.map_or(Decimal::ZERO, |original| {
            original
                .saturating_sub(self.price)
                .saturating_mul(Decimal::from(self.quantity))
                .max(Decimal::ZERO)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(price: i64, original: Option<i64>) -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Kurta".to_string(),
            price: Decimal::from(price),
            original_price: original.map(Decimal::from),
            stock: 10,
            variant: None,
            category: Some("apparel".to_string()),
            is_authentic: true,
            image: None,
        }
    }

    #[test]
    fn test_line_total() {
        let item = LineItem::from_product(product(250, None), 3);
        assert_eq!(item.line_total(), Decimal::from(750));
    }

    #[test]
    fn test_line_total_saturates() {
        let mut item = LineItem::from_product(product(1, None), 3);
        item.price = Decimal::MAX;
        assert_eq!(item.line_total(), Decimal::MAX);

        item.original_price = Some(Decimal::MAX);
        item.price = Decimal::MIN;
        assert_eq!(item.savings(), Decimal::MAX);
    }

    #[test]
    fn test_savings_floored_at_zero() {
        let discounted = LineItem::from_product(product(80, Some(100)), 2);
        assert_eq!(discounted.savings(), Decimal::from(40));

        // An "original" price below the current price never yields negative savings
        let marked_up = LineItem::from_product(product(120, Some(100)), 2);
        assert_eq!(marked_up.savings(), Decimal::ZERO);

        let plain = LineItem::from_product(product(120, None), 2);
        assert_eq!(plain.savings(), Decimal::ZERO);
    }

    #[test]
    fn test_line_item_camel_case_wire_shape() {
        let item = LineItem::from_product(product(80, Some(100)), 1);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["originalPrice"], "100");
        assert_eq!(json["isAuthentic"], true);
        assert!(json.get("variant").is_none());
    }
}
