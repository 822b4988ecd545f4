//! Integration tests for Cartwheel.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwheel-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout` - Reconciliation and order placement through the facade
//! - `wishlist` - Pessimistic wishlist mutations
//! - `coupon` - Coupon apply/remove flow
//! - `persistence` - Durable cart record across sessions
//! - `cancellation` - Cancelled remote calls never reach local state
//! - `http_client` - The reqwest client against a fake commerce service
//!
//! Scenario tests run against [`MockCommerce`], an in-memory service with a
//! call log and scriptable failures. The HTTP tests use [`FakeServer`], which
//! speaks the service's REST wire format over a local socket.

pub mod fixtures;
pub mod mock;
pub mod server;

pub use mock::{Call, Fail, MockCommerce};
pub use server::FakeServer;
