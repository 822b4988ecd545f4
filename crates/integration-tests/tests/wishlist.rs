//! Pessimistic wishlist mutations through the storefront facade.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use cartwheel_core::ProductId;
use cartwheel_engine::cart::MemoryCartStorage;
use cartwheel_engine::notify::{NoticeLevel, Notifier};
use cartwheel_engine::wishlist::WishlistSync;
use cartwheel_engine::{EngineError, Storefront};
use cartwheel_integration_tests::fixtures::product;
use cartwheel_integration_tests::{Call, Fail, MockCommerce};
use tokio_util::sync::CancellationToken;

fn shop(api: &Arc<MockCommerce>) -> Storefront<MockCommerce, MemoryCartStorage> {
    Storefront::new(Arc::clone(api), MemoryCartStorage::new(), Notifier::default())
}

fn ids(shop: &Storefront<MockCommerce, MemoryCartStorage>) -> Vec<ProductId> {
    shop.wishlist()
        .entries()
        .iter()
        .map(|e| e.product_id().clone())
        .collect()
}

#[tokio::test]
async fn test_failed_add_leaves_cache_exactly_as_before() {
    let api = Arc::new(
        MockCommerce::new()
            .with_wishlisted(product("kept", 900, 2))
            .with_product(product("new", 400, 2)),
    );
    let mut shop = shop(&api);
    let cancel = CancellationToken::new();
    shop.fetch_wishlist(&cancel).await.unwrap();
    let before = shop.wishlist().entries().to_vec();

    api.fail_when(|call| matches!(call, Call::AddToWishlist(_)), Fail::Unavailable);
    let mut notices = shop.subscribe();
    let err = shop
        .add_to_wishlist(&product("new", 400, 2), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Network(_)));
    assert_eq!(shop.wishlist().entries(), before.as_slice());
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_add_appends_after_confirmation() {
    let api = Arc::new(MockCommerce::new().with_product(product("a", 400, 2)));
    let mut shop = shop(&api);

    shop.add_to_wishlist(&product("a", 400, 2), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&shop), vec![ProductId::new("a")]);
    assert_eq!(api.remote_wishlist(), vec![ProductId::new("a")]);
}

#[tokio::test]
async fn test_unauthenticated_fetch_resets_cache() {
    let api = Arc::new(MockCommerce::new().with_wishlisted(product("a", 400, 2)));
    let mut shop = shop(&api);
    let cancel = CancellationToken::new();
    shop.fetch_wishlist(&cancel).await.unwrap();
    assert_eq!(shop.wishlist().len(), 1);

    api.fail_when(|call| matches!(call, Call::GetWishlist), Fail::Unauthorized);
    let sync = shop.fetch_wishlist(&cancel).await.unwrap();

    assert!(matches!(sync, WishlistSync::Reset { .. }));
    assert!(shop.wishlist().is_empty());
}

#[tokio::test]
async fn test_remove_and_clear_wait_for_service() {
    let api = Arc::new(
        MockCommerce::new()
            .with_wishlisted(product("a", 400, 2))
            .with_wishlisted(product("b", 500, 2)),
    );
    let mut shop = shop(&api);
    let cancel = CancellationToken::new();
    shop.fetch_wishlist(&cancel).await.unwrap();

    api.fail_when(
        |call| matches!(call, Call::RemoveFromWishlist(_) | Call::ClearWishlist),
        Fail::Unavailable,
    );
    assert!(shop.remove_from_wishlist(&ProductId::new("a"), &cancel).await.is_err());
    assert!(shop.clear_wishlist(&cancel).await.is_err());
    assert_eq!(shop.wishlist().len(), 2);

    api.heal();
    shop.remove_from_wishlist(&ProductId::new("a"), &cancel)
        .await
        .unwrap();
    assert_eq!(ids(&shop), vec![ProductId::new("b")]);

    shop.clear_wishlist(&cancel).await.unwrap();
    assert!(shop.wishlist().is_empty());
    assert!(api.remote_wishlist().is_empty());
}

#[tokio::test]
async fn test_move_to_cart_adds_one_unit_locally() {
    let api = Arc::new(MockCommerce::new().with_wishlisted(product("a", 400, 2)));
    let mut shop = shop(&api);
    let cancel = CancellationToken::new();
    shop.fetch_wishlist(&cancel).await.unwrap();

    let moved = shop.move_to_cart(&ProductId::new("a"), &cancel).await.unwrap();

    assert!(moved.is_some());
    assert!(shop.wishlist().is_empty());
    let line = shop.cart().get(&ProductId::new("a")).unwrap();
    assert_eq!(line.quantity, 1);
    assert_eq!(api.remote_cart(), Some(vec![(ProductId::new("a"), 1)]));
}

#[tokio::test]
async fn test_failed_move_changes_nothing() {
    let api = Arc::new(MockCommerce::new().with_wishlisted(product("a", 400, 2)));
    let mut shop = shop(&api);
    let cancel = CancellationToken::new();
    shop.fetch_wishlist(&cancel).await.unwrap();

    api.fail_when(|call| matches!(call, Call::MoveToCart(_)), Fail::Unavailable);
    assert!(shop.move_to_cart(&ProductId::new("a"), &cancel).await.is_err());

    assert_eq!(shop.wishlist().len(), 1);
    assert!(shop.cart().is_empty());
}

#[tokio::test]
async fn test_move_of_out_of_stock_product_skips_local_add() {
    let api = Arc::new(MockCommerce::new().with_wishlisted(product("gone", 400, 0)));
    let mut shop = shop(&api);
    let cancel = CancellationToken::new();
    shop.fetch_wishlist(&cancel).await.unwrap();

    shop.move_to_cart(&ProductId::new("gone"), &cancel)
        .await
        .unwrap();

    assert!(shop.wishlist().is_empty());
    assert!(shop.cart().is_empty());
}
