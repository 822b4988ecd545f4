//! Core types for Cartwheel.
//!
//! This module provides type-safe wrappers for the purchasing domain.

pub mod coupon;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod wishlist;

pub use coupon::{Coupon, DiscountType};
pub use id::*;
pub use order::{
    OrderConfirmation, OrderRequest, PaymentMethod, ShippingAddress, UnknownPaymentMethod,
};
pub use price::{CurrencyCode, Price, UnknownCurrency};
pub use product::{LineItem, Product, Variant};
pub use wishlist::WishlistEntry;
