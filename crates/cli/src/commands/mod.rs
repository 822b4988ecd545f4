//! Command implementations.
//!
//! Each command drives the [`Shop`] facade and prints its result to stdout.
//! Notices published along the way are printed by the caller.

pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod wishlist;

use cartwheel_core::{PaymentMethod, Product, ProductId, Variant};
use cartwheel_engine::cart::{CartError, FileCartStorage};
use cartwheel_engine::coupon::CouponError;
use cartwheel_engine::remote::HttpCommerceClient;
use cartwheel_engine::{EngineError, Storefront};
use clap::Args;
use rust_decimal::Decimal;
use thiserror::Error;

/// The facade as wired by the binary.
pub type Shop = Storefront<HttpCommerceClient, FileCartStorage>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0} is not in the cart")]
    NotInCart(String),
}

/// Product details, as a product page would dispatch them.
#[derive(Debug, Args)]
pub struct ProductArgs {
    /// Product id
    #[arg(long)]
    pub id: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Unit price
    #[arg(long)]
    pub price: Decimal,

    /// Pre-discount unit price
    #[arg(long)]
    pub original_price: Option<Decimal>,

    /// Units in stock
    #[arg(long)]
    pub stock: u32,

    /// Variant label (e.g., "XL / Red")
    #[arg(long)]
    pub variant: Option<String>,

    /// Category, used by category-restricted coupons
    #[arg(long)]
    pub category: Option<String>,
}

impl From<ProductArgs> for Product {
    fn from(args: ProductArgs) -> Self {
        Self {
            id: ProductId::new(args.id),
            name: args.name,
            price: args.price,
            original_price: args.original_price,
            stock: args.stock,
            variant: args.variant.map(|label| Variant { id: None, label }),
            category: args.category,
            is_authentic: true,
            image: None,
        }
    }
}

/// Shipping and payment details for an order.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Recipient's full name
    #[arg(long)]
    pub name: String,

    /// Contact phone number
    #[arg(long)]
    pub phone: String,

    /// Street address
    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub postal_code: Option<String>,

    /// Payment method (`cod`, `card`, `wallet`)
    #[arg(long, default_value = "cod")]
    pub payment: PaymentMethod,

    /// Delivery notes
    #[arg(long)]
    pub notes: Option<String>,
}
