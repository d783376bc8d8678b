//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod config;
pub mod donate;
pub mod products;

use clap::{Args, Subcommand};

use hope_commerce::donations::{DonationType, DEFAULT_PAYMENT_METHOD};
use hope_commerce::ItemId;

/// Arguments for the products command.
#[derive(Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    pub command: ProductsCommand,
}

#[derive(Subcommand)]
pub enum ProductsCommand {
    /// List products.
    List {
        /// Only show this category.
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Create a product (admin).
    Create {
        /// Product name.
        name: String,
        /// Unit price, e.g. 12.50.
        #[arg(short, long)]
        price: String,
        /// Units in stock.
        #[arg(short, long, default_value = "0")]
        quantity: i64,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        sku: Option<String>,
    },
}

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show the cart.
    Show,
    /// Add a product to the cart.
    Add {
        /// Product id.
        item: ItemId,
        /// Units to add.
        #[arg(short, long, default_value = "1")]
        quantity: i64,
    },
    /// Set the quantity of a cart entry. Zero or less removes it.
    Update {
        /// Product id.
        item: ItemId,
        /// New quantity.
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product from the cart.
    Remove {
        /// Product id.
        item: ItemId,
    },
    /// Empty the cart.
    Clear {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Where to ship the order.
    #[arg(short, long)]
    pub shipping_address: Option<String>,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the donate command.
#[derive(Args)]
pub struct DonateArgs {
    /// Amount, e.g. 25 or 25.50.
    pub amount: String,

    /// one-time, recurring, monthly or annual.
    #[arg(short = 't', long = "type", default_value = "one-time")]
    pub donation_type: DonationType,

    #[arg(short, long, default_value = DEFAULT_PAYMENT_METHOD)]
    pub payment_method: String,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}
