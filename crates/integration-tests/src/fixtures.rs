//! Shared test data.

use cartwheel_core::{
    Coupon, DiscountType, OrderRequest, PaymentMethod, Product, ProductId, ShippingAddress,
};
use rust_decimal::Decimal;

/// A product with the given unit price and stock.
#[must_use]
pub fn product(id: &str, price: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Decimal::from(price),
        original_price: None,
        stock,
        variant: None,
        category: Some("apparel".to_string()),
        is_authentic: true,
        image: Some(format!("https://cdn.example.com/{id}.jpg")),
    }
}

/// `C10`: ten percent off.
#[must_use]
pub fn ten_percent() -> Coupon {
    Coupon {
        code: "C10".to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: Decimal::from(10),
        description: "10% off your order".to_string(),
    }
}

/// `FLAT500`: 500 off.
#[must_use]
pub fn flat_500() -> Coupon {
    Coupon {
        code: "FLAT500".to_string(),
        discount_type: DiscountType::Flat,
        discount_value: Decimal::from(500),
        description: String::new(),
    }
}

/// A complete cash-on-delivery order.
#[must_use]
pub fn order_request() -> OrderRequest {
    OrderRequest {
        shipping_address: ShippingAddress {
            full_name: "Tanvir Hasan".to_string(),
            phone: "01811000000".to_string(),
            address_line: "Flat 4B, 27 Lake Road".to_string(),
            city: "Chattogram".to_string(),
            postal_code: Some("4000".to_string()),
        },
        payment_method: PaymentMethod::CashOnDelivery,
        notes: Some("Call before delivery".to_string()),
    }
}
