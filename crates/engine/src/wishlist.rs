//! Local cache of the remote wishlist.
//!
//! Every mutation is pessimistic: the remote call goes first and the cache
//! only changes once the service confirms. The cache has no durable layer of
//! its own; [`WishlistStore::fetch`] replaces it wholesale.

use std::sync::Arc;

use cartwheel_core::{Product, ProductId, WishlistEntry};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{EngineError, Result};
use crate::notify::Notifier;
use crate::remote::{ApiError, WishlistApi, until_cancelled};

/// Result of refreshing the cache from the service.
#[derive(Debug)]
pub enum WishlistSync {
    /// Cache replaced with `count` entries.
    Loaded { count: usize },
    /// The service could not be read (signed out, unreachable, ...) and the
    /// cache was reset to empty.
    Reset { reason: ApiError },
}

/// Wishlist cache backed by a [`WishlistApi`].
#[derive(Debug)]
pub struct WishlistStore<A> {
    api: Arc<A>,
    entries: Vec<WishlistEntry>,
    notifier: Notifier,
}

impl<A: WishlistApi> WishlistStore<A> {
    /// Create an empty store. Call [`fetch`](Self::fetch) to populate it.
    pub const fn new(api: Arc<A>, notifier: Notifier) -> Self {
        Self {
            api,
            entries: Vec::new(),
            notifier,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entries.iter().any(|e| e.product_id() == product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the cache with the service's wishlist.
    ///
    /// A remote failure is not an error here: the cache is reset to empty and
    /// the reason is reported in [`WishlistSync::Reset`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] if `cancel` fires first; the cache is
    /// left as it was.
    #[instrument(skip_all)]
    pub async fn fetch(&mut self, cancel: &CancellationToken) -> Result<WishlistSync> {
        let response = until_cancelled(cancel, self.api.get_wishlist())
            .await
            .ok_or(EngineError::Cancelled)?;

        match response {
            Ok(entries) => {
                let count = entries.len();
                self.entries = entries;
                debug!(count, "Wishlist loaded");
                Ok(WishlistSync::Loaded { count })
            }
            Err(reason) => {
                warn!(error = %reason, "Failed to load wishlist, resetting cache");
                self.entries.clear();
                Ok(WishlistSync::Reset { reason })
            }
        }
    }

    /// Save a product.
    ///
    /// The service is always asked, even if the cache already holds the
    /// product, since the cache may be stale. The confirmed entry replaces any
    /// cached one.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the service rejects the request or `cancel`
    /// fires. The cache is untouched in both cases.
    #[instrument(skip_all, fields(product_id = %product.id))]
    pub async fn add(&mut self, product: &Product, cancel: &CancellationToken) -> Result<()> {
        let entry = self
            .remote(cancel, self.api.add_to_wishlist(&product.id))
            .await?
            .unwrap_or_else(|| WishlistEntry {
                product: product.clone(),
                added_at: Utc::now(),
            });
        let replaced = self.take(&product.id).is_some();
        self.entries.push(entry);

        debug!(replaced, "Wishlist entry added");
        self.notifier
            .success(format!("Added {} to wishlist", product.name));
        Ok(())
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the service rejects the request or `cancel`
    /// fires. The cache is untouched in both cases.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn remove(
        &mut self,
        product_id: &ProductId,
        cancel: &CancellationToken,
    ) -> Result<Option<WishlistEntry>> {
        self.remote(cancel, self.api.remove_from_wishlist(product_id))
            .await?;
        let removed = self.take(product_id);

        debug!(cached = removed.is_some(), "Wishlist entry removed");
        self.notifier.success(removed.as_ref().map_or_else(
            || "Removed from wishlist".to_string(),
            |e| format!("Removed {} from wishlist", e.product.name),
        ));
        Ok(removed)
    }

    /// Remove every saved product.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the service rejects the request or `cancel`
    /// fires. The cache is untouched in both cases.
    #[instrument(skip_all)]
    pub async fn clear(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.remote(cancel, self.api.clear_wishlist()).await?;
        self.entries.clear();

        debug!("Wishlist cleared");
        self.notifier.success("Wishlist cleared");
        Ok(())
    }

    /// Move a saved product into the remote cart and drop it from the cache.
    ///
    /// This does not touch the local cart; the caller owns that step.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the service rejects the request or `cancel`
    /// fires. The cache is untouched in both cases.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn move_to_cart(
        &mut self,
        product_id: &ProductId,
        cancel: &CancellationToken,
    ) -> Result<Option<WishlistEntry>> {
        self.remote(cancel, self.api.move_to_cart(product_id)).await?;
        let moved = self.take(product_id);

        debug!(cached = moved.is_some(), "Wishlist entry moved to cart");
        self.notifier.success(moved.as_ref().map_or_else(
            || "Moved to cart".to_string(),
            |e| format!("Moved {} to cart", e.product.name),
        ));
        Ok(moved)
    }

    fn take(&mut self, product_id: &ProductId) -> Option<WishlistEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.product_id() == product_id)?;
        Some(self.entries.remove(index))
    }

    /// Await a remote mutation, turning failures into notices and errors.
    async fn remote<T>(
        &self,
        cancel: &CancellationToken,
        call: impl Future<Output = std::result::Result<T, ApiError>>,
    ) -> Result<T> {
        match until_cancelled(cancel, call).await {
            None => {
                debug!("Wishlist call cancelled");
                Err(EngineError::Cancelled)
            }
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => {
                warn!(error = %e, "Wishlist call failed");
                let err = EngineError::Network(e);
                self.notifier.error(err.user_message());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::notify::NoticeLevel;

    /// Wishlist service that records calls and fails on demand.
    #[derive(Default)]
    struct FakeWishlist {
        remote: Mutex<Vec<WishlistEntry>>,
        fail: Mutex<bool>,
        /// Confirm adds without echoing the entry.
        silent: Mutex<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeWishlist {
        fn failing() -> Self {
            Self {
                fail: Mutex::new(true),
                ..Self::default()
            }
        }

        fn record(&self, call: String) -> std::result::Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            if *self.fail.lock().unwrap() {
                Err(ApiError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Saree {id}"),
            price: Decimal::from(3200),
            original_price: None,
            stock: 3,
            variant: None,
            category: None,
            is_authentic: true,
            image: None,
        }
    }

    fn entry(id: &str) -> WishlistEntry {
        WishlistEntry {
            product: product(id),
            added_at: Utc::now(),
        }
    }

    impl WishlistApi for FakeWishlist {
        async fn get_wishlist(&self) -> std::result::Result<Vec<WishlistEntry>, ApiError> {
            self.record("get".to_string())?;
            Ok(self.remote.lock().unwrap().clone())
        }

        async fn add_to_wishlist(
            &self,
            product_id: &ProductId,
        ) -> std::result::Result<Option<WishlistEntry>, ApiError> {
            self.record(format!("add {product_id}"))?;
            if *self.silent.lock().unwrap() {
                return Ok(None);
            }
            let added = entry(product_id.as_str());
            let mut remote = self.remote.lock().unwrap();
            remote.retain(|e| e.product_id() != product_id);
            remote.push(added.clone());
            Ok(Some(added))
        }

        async fn remove_from_wishlist(
            &self,
            product_id: &ProductId,
        ) -> std::result::Result<(), ApiError> {
            self.record(format!("remove {product_id}"))?;
            self.remote
                .lock()
                .unwrap()
                .retain(|e| e.product_id() != product_id);
            Ok(())
        }

        async fn clear_wishlist(&self) -> std::result::Result<(), ApiError> {
            self.record("clear".to_string())?;
            self.remote.lock().unwrap().clear();
            Ok(())
        }

        async fn move_to_cart(&self, product_id: &ProductId) -> std::result::Result<(), ApiError> {
            self.record(format!("move {product_id}"))?;
            self.remote
                .lock()
                .unwrap()
                .retain(|e| e.product_id() != product_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fetch_replaces_cache() {
        let api = Arc::new(FakeWishlist::default());
        api.remote.lock().unwrap().extend([entry("a"), entry("b")]);
        let mut store = WishlistStore::new(api, Notifier::default());

        let sync = store.fetch(&CancellationToken::new()).await.unwrap();

        assert!(matches!(sync, WishlistSync::Loaded { count: 2 }));
        assert!(store.contains(&ProductId::new("b")));
    }

    #[tokio::test]
    async fn test_fetch_failure_resets_quietly() {
        let api = Arc::new(FakeWishlist::default());
        let mut store = WishlistStore::new(api.clone(), Notifier::default());
        store.add(&product("a"), &CancellationToken::new()).await.unwrap();

        *api.fail.lock().unwrap() = true;
        let sync = store.fetch(&CancellationToken::new()).await.unwrap();

        assert!(matches!(sync, WishlistSync::Reset { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_leaves_cache_unchanged() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let mut store = WishlistStore::new(Arc::new(FakeWishlist::failing()), notifier);

        let err = store
            .add(&product("a"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Network(_)));
        assert!(store.is_empty());
        assert_eq!(rx.try_recv().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_add_existing_still_reaches_remote() {
        let api = Arc::new(FakeWishlist::default());
        let mut store = WishlistStore::new(api.clone(), Notifier::default());
        let cancel = CancellationToken::new();

        store.add(&product("a"), &cancel).await.unwrap();
        store.add(&product("a"), &cancel).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["add a".to_string(), "add a".to_string()]
        );
    }

    #[tokio::test]
    async fn test_add_repairs_stale_cache() {
        let api = Arc::new(FakeWishlist::default());
        api.remote.lock().unwrap().push(entry("a"));
        let mut store = WishlistStore::new(api.clone(), Notifier::default());
        let cancel = CancellationToken::new();
        store.fetch(&cancel).await.unwrap();

        // Removed elsewhere after the fetch
        api.remote.lock().unwrap().clear();
        store.add(&product("a"), &cancel).await.unwrap();

        assert_eq!(api.remote.lock().unwrap().len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["get".to_string(), "add a".to_string()]
        );
    }

    #[tokio::test]
    async fn test_add_without_echoed_entry_caches_product() {
        let api = Arc::new(FakeWishlist::default());
        *api.silent.lock().unwrap() = true;
        let mut store = WishlistStore::new(api, Notifier::default());

        store.add(&product("a"), &CancellationToken::new()).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].product.name, "Saree a");
    }

    #[tokio::test]
    async fn test_remove_waits_for_remote() {
        let api = Arc::new(FakeWishlist::default());
        let mut store = WishlistStore::new(api.clone(), Notifier::default());
        let cancel = CancellationToken::new();
        store.add(&product("a"), &cancel).await.unwrap();

        *api.fail.lock().unwrap() = true;
        assert!(store.remove(&ProductId::new("a"), &cancel).await.is_err());
        assert_eq!(store.len(), 1);

        *api.fail.lock().unwrap() = false;
        let removed = store.remove(&ProductId::new("a"), &cancel).await.unwrap();
        assert_eq!(removed.unwrap().product.name, "Saree a");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clear_and_move_to_cart() {
        let api = Arc::new(FakeWishlist::default());
        let mut store = WishlistStore::new(api, Notifier::default());
        let cancel = CancellationToken::new();
        store.add(&product("a"), &cancel).await.unwrap();
        store.add(&product("b"), &cancel).await.unwrap();

        let moved = store.move_to_cart(&ProductId::new("a"), &cancel).await.unwrap();
        assert!(moved.is_some());
        assert_eq!(store.len(), 1);

        store.clear(&cancel).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_call_never_applies() {
        let api = Arc::new(FakeWishlist::default());
        let mut store = WishlistStore::new(api, Notifier::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store.add(&product("a"), &cancel).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(store.is_empty());

        assert!(matches!(
            store.fetch(&cancel).await,
            Err(EngineError::Cancelled)
        ));
    }
}
