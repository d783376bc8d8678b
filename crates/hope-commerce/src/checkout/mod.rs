//! Checkout module.
//!
//! Contains the checkout state machine and the order types it exchanges
//! with the API.

mod flow;
mod order;

pub use flow::{CheckoutFlow, CheckoutState, DEFAULT_ORDER_CONTEXT, GENERIC_CHECKOUT_FAILURE};
pub use order::{Order, OrderItem, OrderJobs, OrderLine, OrderRequest, OrderStatus};
