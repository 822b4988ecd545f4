//! Cartwheel Core - Shared purchasing types.
//!
//! This crate provides the types exchanged between the Cartwheel components:
//! - `engine` - Cart/wishlist state, pricing, and checkout reconciliation
//! - `cli` - Command-line collaborator driving the engine
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no persistence,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Id newtypes, products, line items, coupons, wishlist entries, orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
