//! Checkout reconciliation through the storefront facade.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cartwheel_core::ProductId;
use cartwheel_engine::cart::MemoryCartStorage;
use cartwheel_engine::error::ReconcileStage;
use cartwheel_engine::notify::{NoticeLevel, Notifier};
use cartwheel_engine::{EngineError, Storefront};
use cartwheel_integration_tests::fixtures::{order_request, product};
use cartwheel_integration_tests::{Call, Fail, MockCommerce};
use tokio_util::sync::CancellationToken;

fn shop(api: &Arc<MockCommerce>) -> (Storefront<MockCommerce, MemoryCartStorage>, MemoryCartStorage) {
    let storage = MemoryCartStorage::new();
    (
        Storefront::new(Arc::clone(api), storage.clone(), Notifier::default()),
        storage,
    )
}

fn mock() -> Arc<MockCommerce> {
    Arc::new(
        MockCommerce::new()
            .with_product(product("x", 800, 5))
            .with_product(product("y", 600, 5)),
    )
}

#[tokio::test]
async fn test_failed_replay_aborts_checkout_and_keeps_local_cart() {
    let api = mock();
    api.fail_when(
        |call| matches!(call, Call::AddCartItem(id, _) if id.as_str() == "y"),
        Fail::Rejected("Product y is no longer available".to_string()),
    );
    let (mut shop, _) = shop(&api);
    shop.add_to_cart(product("x", 800, 5), 1).unwrap();
    shop.add_to_cart(product("y", 600, 5), 2).unwrap();
    let before = shop.view();

    let err = shop
        .checkout(&order_request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Reconciliation {
            stage: ReconcileStage::ReplayItem,
            rolled_back: true,
            ..
        }
    ));
    assert_eq!(shop.view(), before);
    let calls = api.calls();
    assert!(!calls.iter().any(Call::is_order));
    assert_eq!(
        calls,
        vec![
            Call::ClearCart,
            Call::AddCartItem(ProductId::new("x"), 1),
            Call::AddCartItem(ProductId::new("y"), 2),
            Call::ClearCart,
        ]
    );
    // Compensating clear removed the partial copy
    assert_eq!(api.remote_cart(), Some(Vec::new()));
    assert!(api.orders().is_empty());
}

#[tokio::test]
async fn test_successful_checkout_places_order_and_clears_local_cart() {
    let api = mock();
    let (mut shop, storage) = shop(&api);
    let mut notices = shop.subscribe();
    shop.add_to_cart(product("x", 800, 5), 1).unwrap();
    shop.add_to_cart(product("y", 600, 5), 2).unwrap();

    let receipt = shop
        .checkout(&order_request(), &CancellationToken::new())
        .await
        .unwrap();

    let orders = api.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(
        orders[0].lines,
        vec![(ProductId::new("x"), 1), (ProductId::new("y"), 2)]
    );
    assert_eq!(orders[0].idempotency_key, receipt.attempt_id.to_string());
    assert_eq!(orders[0].request, order_request());
    assert_eq!(receipt.confirmation.order_number, "CW-1001");

    assert!(shop.view().is_empty());
    assert!(storage.snapshot().unwrap().items.is_empty());

    let last = std::iter::from_fn(|| notices.try_recv().ok()).last().unwrap();
    assert_eq!(last.level, NoticeLevel::Success);
    assert!(last.message.contains("CW-1001"));
}

#[tokio::test]
async fn test_remote_cart_replaced_not_merged() {
    let api = Arc::new(
        MockCommerce::new()
            .with_product(product("x", 800, 5))
            .with_remote_cart(vec![(ProductId::new("stale"), 4)]),
    );
    let (mut shop, _) = shop(&api);
    shop.add_to_cart(product("x", 800, 5), 3).unwrap();

    shop.checkout(&order_request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(api.orders()[0].lines, vec![(ProductId::new("x"), 3)]);
}

#[tokio::test]
async fn test_order_failure_keeps_local_cart_for_retry() {
    let api = mock();
    api.fail_when(Call::is_order, Fail::Unavailable);
    let (mut shop, _) = shop(&api);
    shop.add_to_cart(product("x", 800, 5), 2).unwrap();
    let cancel = CancellationToken::new();

    let err = shop.checkout(&order_request(), &cancel).await.unwrap_err();
    assert!(matches!(err, EngineError::OrderFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(shop.view().item_count, 2);

    api.heal();
    shop.checkout(&order_request(), &cancel).await.unwrap();
    assert_eq!(api.orders().len(), 1);
    assert!(shop.view().is_empty());
}

#[tokio::test]
async fn test_each_attempt_gets_its_own_idempotency_key() {
    let api = mock();
    api.fail_when(Call::is_order, Fail::Unavailable);
    let (mut shop, _) = shop(&api);
    shop.add_to_cart(product("x", 800, 5), 1).unwrap();
    let cancel = CancellationToken::new();

    let _ = shop.checkout(&order_request(), &cancel).await;
    let _ = shop.checkout(&order_request(), &cancel).await;

    let keys: Vec<String> = api
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::CreateOrder { idempotency_key } => Some(idempotency_key),
            _ => None,
        })
        .collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn test_failed_rollback_is_reported() {
    let api = mock();
    api.fail_when(
        |call| matches!(call, Call::AddCartItem(id, _) if id.as_str() == "y"),
        Fail::Unavailable,
    );
    let (mut shop, _) = shop(&api);
    shop.add_to_cart(product("x", 800, 5), 1).unwrap();
    shop.add_to_cart(product("y", 600, 5), 1).unwrap();

    // Let the initial clear through, fail the compensating one
    let clears = AtomicUsize::new(0);
    api.fail_when(
        move |call| matches!(call, Call::ClearCart) && clears.fetch_add(1, Ordering::SeqCst) >= 1,
        Fail::Unavailable,
    );

    let err = shop
        .checkout(&order_request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Reconciliation {
            rolled_back: false,
            ..
        }
    ));
}

#[tokio::test]
async fn test_invalid_checkout_makes_no_remote_calls() {
    let api = mock();
    let (mut shop, _) = shop(&api);
    let cancel = CancellationToken::new();

    let err = shop.checkout(&order_request(), &cancel).await.unwrap_err();
    assert_eq!(err.user_message(), "Your cart is empty");

    shop.add_to_cart(product("x", 800, 5), 1).unwrap();
    let mut request = order_request();
    request.shipping_address.phone = String::new();
    let err = shop.checkout(&request, &cancel).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(api.calls().is_empty());
}
