//! Wishlist commands. Each one waits for the service before changing anything.

use cartwheel_core::ProductId;
use cartwheel_engine::wishlist::WishlistSync;
use tokio_util::sync::CancellationToken;

use super::{CommandError, ProductArgs, Shop};

pub async fn list(shop: &mut Shop, cancel: &CancellationToken) -> Result<(), CommandError> {
    if let WishlistSync::Reset { reason } = shop.fetch_wishlist(cancel).await? {
        println!("Wishlist unavailable: {reason}");
        return Ok(());
    }

    if shop.wishlist().is_empty() {
        println!("Your wishlist is empty");
    }
    for entry in shop.wishlist().entries() {
        let product = &entry.product;
        let availability = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{:<12} {} {} ({availability}, saved {})",
            product.id,
            product.name,
            product.price,
            entry.added_at.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

pub async fn add(
    shop: &mut Shop,
    product: ProductArgs,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    shop.add_to_wishlist(&product.into(), cancel).await?;
    Ok(())
}

pub async fn remove(shop: &mut Shop, id: &str, cancel: &CancellationToken) -> Result<(), CommandError> {
    shop.remove_from_wishlist(&ProductId::new(id), cancel).await?;
    Ok(())
}

pub async fn clear(shop: &mut Shop, cancel: &CancellationToken) -> Result<(), CommandError> {
    shop.clear_wishlist(cancel).await?;
    Ok(())
}

pub async fn move_to_cart(
    shop: &mut Shop,
    id: &str,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    // The cache is empty in a fresh process; load it so the product details
    // are available for the local cart.
    shop.fetch_wishlist(cancel).await?;
    shop.move_to_cart(&ProductId::new(id), cancel).await?;
    Ok(())
}
