//! Cartwheel CLI - a terminal storefront over the cart engine.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart with totals
//! cartwheel cart show
//!
//! # Add two units of a product
//! cartwheel cart add --id p-101 --name "Cotton Panjabi" --price 1450 --stock 8 -q 2
//!
//! # Apply a coupon
//! cartwheel coupon apply EID10
//!
//! # Save a product, then move it to the cart
//! cartwheel wishlist add --id p-202 --name "Silk Saree" --price 5200 --stock 3
//! cartwheel wishlist move p-202
//!
//! # Place the order
//! cartwheel checkout --name "Nusrat Jahan" --phone 01700000000 \
//!     --address "House 12, Road 5" --city Dhaka --payment cod
//! ```
//!
//! Ctrl-C cancels an in-flight remote call; local state is left as it was.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use cartwheel_engine::config::EngineConfig;
use cartwheel_engine::notify::{Notice, NoticeLevel, Notifier};
use cartwheel_engine::Storefront;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CheckoutArgs, CommandError, ProductArgs};

#[derive(Parser)]
#[command(name = "cartwheel")]
#[command(author, version, about = "Cartwheel storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Apply or remove the cart coupon
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
    /// Manage the remote wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Reconcile the remote cart and place the order
    Checkout(CheckoutArgs),
}

#[derive(Subcommand)]
enum CartAction {
    /// Show items and totals
    Show {
        /// Print the cart view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a product
    Add {
        #[command(flatten)]
        product: ProductArgs,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove {
        /// Product id
        id: String,
    },
    /// Set a product's quantity (0 removes it)
    Update {
        /// Product id
        id: String,

        /// New quantity
        quantity: u32,
    },
    /// Empty the cart and drop its coupon
    Clear,
}

#[derive(Subcommand)]
enum CouponAction {
    /// Validate a code and apply it
    Apply {
        /// Coupon code
        code: String,
    },
    /// Remove the applied coupon
    Remove,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List saved products
    List,
    /// Save a product
    Add {
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Remove a saved product
    Remove {
        /// Product id
        id: String,
    },
    /// Remove every saved product
    Clear,
    /// Move a saved product into the cart
    Move {
        /// Product id
        id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &EngineConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Errors and warnings become Sentry events, info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartwheel_engine=info,cartwheel_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let result = run(cli, &config, &cancel).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut shop = Storefront::from_config(config, Notifier::default())?;
    let mut notices = shop.subscribe();

    let result: Result<(), CommandError> = match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show { json } => commands::cart::show(&shop, json),
            CartAction::Add { product, quantity } => {
                commands::cart::add(&mut shop, product, quantity)
            }
            CartAction::Remove { id } => commands::cart::remove(&mut shop, &id),
            CartAction::Update { id, quantity } => commands::cart::update(&mut shop, &id, quantity),
            CartAction::Clear => {
                shop.clear_cart();
                Ok(())
            }
        },
        Commands::Coupon { action } => match action {
            CouponAction::Apply { code } => commands::coupon::apply(&mut shop, &code, cancel).await,
            CouponAction::Remove => commands::coupon::remove(&mut shop, cancel).await,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::List => commands::wishlist::list(&mut shop, cancel).await,
            WishlistAction::Add { product } => {
                commands::wishlist::add(&mut shop, product, cancel).await
            }
            WishlistAction::Remove { id } => {
                commands::wishlist::remove(&mut shop, &id, cancel).await
            }
            WishlistAction::Clear => commands::wishlist::clear(&mut shop, cancel).await,
            WishlistAction::Move { id } => commands::wishlist::move_to_cart(&mut shop, &id, cancel).await,
        },
        Commands::Checkout(args) => commands::checkout::run(&mut shop, args, cancel).await,
    };

    print_notices(&mut notices);
    result.map_err(Into::into)
}

/// Drain notices published while the command ran.
fn print_notices(notices: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}
