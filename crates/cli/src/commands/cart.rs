//! Local cart commands. None of these touch the network.

use cartwheel_core::ProductId;

use super::{CommandError, ProductArgs, Shop};

/// Print the cart with its price summary.
pub fn show(shop: &Shop, json: bool) -> Result<(), CommandError> {
    let view = shop.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    if view.is_empty() {
        println!("Your cart is empty");
    }
    for item in &view.items {
        let variant = item
            .variant
            .as_ref()
            .map(|v| format!(" ({})", v.label))
            .unwrap_or_default();
        println!(
            "{:<12} {}{} x{} @ {} = {}",
            item.id,
            item.name,
            variant,
            item.quantity,
            view.price(item.price),
            view.price(item.line_total()),
        );
    }

    let summary = &view.summary;
    println!();
    println!("Items:    {}", view.item_count);
    println!("Subtotal: {}", view.price(summary.subtotal));
    println!("Shipping: {}", view.price(summary.shipping));
    if let Some(coupon) = &view.applied_coupon {
        println!("Discount: -{} ({})", view.price(summary.discount), coupon.code);
    }
    if !summary.savings.is_zero() {
        println!("You save: {}", view.price(summary.savings));
    }
    println!("Total:    {}", view.total());
    Ok(())
}

pub fn add(shop: &mut Shop, product: ProductArgs, quantity: u32) -> Result<(), CommandError> {
    let id = product.id.clone();
    let quantity = shop.add_to_cart(product.into(), quantity)?;
    println!("{id}: {quantity} in cart");
    Ok(())
}

pub fn remove(shop: &mut Shop, id: &str) -> Result<(), CommandError> {
    shop.remove_from_cart(&ProductId::new(id))
        .map(|_| ())
        .ok_or_else(|| CommandError::NotInCart(id.to_string()))
}

pub fn update(shop: &mut Shop, id: &str, quantity: u32) -> Result<(), CommandError> {
    let product_id = ProductId::new(id);
    if shop.cart().get(&product_id).is_none() {
        return Err(CommandError::NotInCart(id.to_string()));
    }
    match shop.update_quantity(&product_id, quantity) {
        Some(quantity) => println!("{id}: {quantity} in cart"),
        None => println!("{id}: removed"),
    }
    Ok(())
}
