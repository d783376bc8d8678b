//! Checkout flow state machine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use hope_cache::IdempotencyKeys;

use crate::api::OrderGateway;
use crate::cart::CartStore;
use crate::checkout::{Order, OrderRequest};
use crate::error::CommerceError;

/// Order context the checkout key is stored under by default.
pub const DEFAULT_ORDER_CONTEXT: &str = "last-order";

/// Shown when an order fails without a server explanation.
pub const GENERIC_CHECKOUT_FAILURE: &str = "Failed to place order";

/// Where the checkout currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckoutState {
    /// Ready to submit. Also the state after a failed attempt.
    #[default]
    Idle,
    /// An order request is in flight.
    Submitting,
    /// The last order was placed.
    Success,
}

impl CheckoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Submitting => "submitting",
            CheckoutState::Success => "success",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns a cart into an order, at most once per idempotency key.
///
/// A key is stored under the flow's order context before the request goes
/// out, bound to the request's fingerprint. A failed attempt whose outcome is
/// unknown leaves the key in place so resubmitting the same cart reuses it and
/// the server can recognise the resubmission. A changed cart gets a new key.
///
/// # Example
///
/// ```rust,ignore
/// let mut flow = CheckoutFlow::new(Arc::new(api), IdempotencyKeys::new(cache.clone()));
/// let mut states = flow.subscribe();
///
/// match flow.submit(&mut cart, Some(address)).await {
///     Ok(order) => println!("order #{} placed", order.id),
///     Err(e) => println!("{}", e.user_message(GENERIC_CHECKOUT_FAILURE)),
/// }
/// ```
pub struct CheckoutFlow {
    gateway: Arc<dyn OrderGateway>,
    keys: IdempotencyKeys,
    context: String,
    state: watch::Sender<CheckoutState>,
    last_error: Option<String>,
    last_order: Option<Order>,
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("context", &self.context)
            .field("state", &self.state())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl CheckoutFlow {
    /// Create an idle flow using the default order context.
    pub fn new(gateway: Arc<dyn OrderGateway>, keys: IdempotencyKeys) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            gateway,
            keys,
            context: DEFAULT_ORDER_CONTEXT.to_string(),
            state,
            last_error: None,
            last_order: None,
        }
    }

    /// Store keys under a different order context.
    pub fn with_order_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn order_context(&self) -> &str {
        &self.context
    }

    pub fn state(&self) -> CheckoutState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// Message from the most recent failed attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Order from the most recent successful attempt.
    pub fn last_order(&self) -> Option<&Order> {
        self.last_order.as_ref()
    }

    /// Whether a submit would go out right now.
    pub fn can_submit(&self, cart: &CartStore) -> bool {
        self.state() != CheckoutState::Submitting && !cart.is_empty()
    }

    /// Return to `Idle` and drop the last error.
    pub fn reset(&mut self) {
        self.last_error = None;
        self.transition(CheckoutState::Idle);
    }

    /// Place an order for everything in `cart`.
    ///
    /// An empty cart is rejected without any state change or request. On
    /// success the cart is cleared and the stored key forgotten. On failure
    /// the cart is left as it was and the flow returns to `Idle` with
    /// [`last_error`](Self::last_error) set.
    pub async fn submit(
        &mut self,
        cart: &mut CartStore,
        shipping_address: Option<String>,
    ) -> Result<Order, CommerceError> {
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let request = OrderRequest::from_cart(cart.state(), shipping_address);
        let key = match self.keys.key_for(&self.context, &request.fingerprint()) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, context = %self.context, "could not obtain idempotency key");
                let err = CommerceError::from(e);
                self.last_error = Some(err.user_message(GENERIC_CHECKOUT_FAILURE));
                return Err(err);
            }
        };

        self.last_error = None;
        self.transition(CheckoutState::Submitting);

        match self.gateway.create_order(&request, &key).await {
            Ok(order) => {
                if let Err(e) = cart.clear_cart() {
                    // Keep the key: resubmitting this cart must hit the same order.
                    tracing::error!(order = %order.id, error = %e, "order placed but cart could not be cleared");
                } else if let Err(e) = self.keys.forget_key(&self.context) {
                    tracing::warn!(error = %e, "could not forget idempotency key");
                }

                tracing::info!(
                    order = %order.id,
                    total = %order.total_amount,
                    status = %order.status,
                    "order placed"
                );
                self.last_order = Some(order.clone());
                self.transition(CheckoutState::Success);
                Ok(order)
            }
            Err(e) => {
                if e.keeps_idempotency_key() {
                    tracing::warn!(error = %e, key = %key, "order failed, key kept for retry");
                } else {
                    tracing::warn!(error = %e, "order rejected");
                    if let Err(forget) = self.keys.forget_key(&self.context) {
                        tracing::warn!(error = %forget, "could not forget idempotency key");
                    }
                }

                self.last_error = Some(e.user_message(GENERIC_CHECKOUT_FAILURE));
                self.transition(CheckoutState::Idle);
                Err(e.into())
            }
        }
    }

    fn transition(&mut self, next: CheckoutState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "checkout state changed");
        }
    }
}
