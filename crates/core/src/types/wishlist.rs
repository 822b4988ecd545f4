//! Wishlist entries held by the remote service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// A saved product plus when it was saved.
///
/// Entries are unique by product identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product: Product,
    pub added_at: DateTime<Utc>,
}

impl WishlistEntry {
    /// The product identity this entry is unique by.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }
}
