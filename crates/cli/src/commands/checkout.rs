//! Order placement.

use cartwheel_core::{OrderRequest, ShippingAddress};
use tokio_util::sync::CancellationToken;

use super::{CheckoutArgs, CommandError, Shop};

pub async fn run(
    shop: &mut Shop,
    args: CheckoutArgs,
    cancel: &CancellationToken,
) -> Result<(), CommandError> {
    let request = OrderRequest {
        shipping_address: ShippingAddress {
            full_name: args.name,
            phone: args.phone,
            address_line: args.address,
            city: args.city,
            postal_code: args.postal_code,
        },
        payment_method: args.payment,
        notes: args.notes,
    };

    let total = shop.view().total();
    tracing::info!(total = %total, payment = %request.payment_method, "Placing order");

    let receipt = shop.checkout(&request, cancel).await?;
    let confirmation = &receipt.confirmation;
    println!("Order {} confirmed", confirmation.order_number);
    println!("Order id: {}", confirmation.order_id);
    println!("Charged:  {}", shop.view().price(confirmation.total_amount));
    if let Some(eta) = &confirmation.estimated_delivery {
        println!("Delivery: {eta}");
    }
    Ok(())
}
