//! Cartwheel cart and wishlist state engine.
//!
//! A client-side engine for a storefront:
//!
//! - [`cart`] - optimistic local cart with a durable record
//! - [`wishlist`] - pessimistic cache of the remote wishlist
//! - [`pricing`] - pure subtotal/shipping/discount/total computation
//! - [`coupon`] - remote coupon validation
//! - [`checkout`] - remote cart reconciliation and order placement
//! - [`engine`] - the [`Storefront`] facade tying them together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod engine;
pub mod error;
pub mod notify;
pub mod pricing;
pub mod remote;
pub mod wishlist;

pub use engine::{CartView, Storefront};
pub use error::{EngineError, Result};
