//! Coupon commands.

use tokio_util::sync::CancellationToken;

use super::{CommandError, Shop};

pub async fn apply(shop: &mut Shop, code: &str, cancel: &CancellationToken) -> Result<(), CommandError> {
    let coupon = shop.apply_coupon(code, cancel).await?;
    let summary = shop.view();
    println!(
        "{} applied, {} off",
        coupon.code,
        summary.price(summary.summary.discount)
    );
    Ok(())
}

pub async fn remove(shop: &mut Shop, cancel: &CancellationToken) -> Result<(), CommandError> {
    if shop.remove_coupon(cancel).await?.is_none() {
        println!("No coupon applied");
    }
    Ok(())
}
