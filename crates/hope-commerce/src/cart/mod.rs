//! Shopping cart.

mod item;
mod state;
mod store;

pub use item::CartItem;
pub use state::CartState;
pub use store::{CartStore, SubscriptionId, CART_STORAGE_KEY};
