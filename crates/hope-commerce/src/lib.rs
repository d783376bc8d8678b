//! Storefront domain types and logic for Hope Services.
//!
//! This crate provides the client side of the storefront:
//!
//! - **Catalog**: Products and admin product creation
//! - **Cart**: Persisted shopping cart with change listeners
//! - **Checkout**: Idempotent order submission and order types
//! - **Donations**: One-time and recurring donations
//! - **API**: Gateway traits and their HTTP implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use hope_commerce::prelude::*;
//! use hope_cache::{Cache, FileStore, IdempotencyKeys};
//!
//! let cache = Cache::new(FileStore::open("storage.json")?);
//! let api = Arc::new(ApiClient::new(FetchClient::new().with_base_url(base_url)));
//!
//! // Browse and fill the cart
//! let products = list_items(api.as_ref(), Some("food")).await?;
//! let mut cart = CartStore::open(cache.clone())?;
//! cart.add_item(CartItem::from_inventory(&products[0])?, 2)?;
//!
//! // Place the order
//! let mut checkout = CheckoutFlow::new(api, IdempotencyKeys::new(cache));
//! let order = checkout.submit(&mut cart, None).await?;
//! println!("Total: {}", order.total_amount);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod donations;

pub use error::CommerceError;
pub use ids::*;
pub use money::Money;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::Money;

    // API
    pub use crate::api::{ApiClient, ApiError, CatalogGateway, DonationGateway, OrderGateway};

    // Catalog
    pub use crate::catalog::{create_item, list_items, InventoryItem, NewInventoryItem};

    // Cart
    pub use crate::cart::{CartItem, CartState, CartStore, SubscriptionId};

    // Checkout
    pub use crate::checkout::{
        CheckoutFlow, CheckoutState, Order, OrderItem, OrderLine, OrderRequest, OrderStatus,
    };

    // Donations
    pub use crate::donations::{submit_donation, Donation, DonationRequest, DonationType};
}
