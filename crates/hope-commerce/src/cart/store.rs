//! Persisted cart with change notification.

use serde::{Deserialize, Serialize};

use hope_cache::{Cache, CacheError};

use crate::cart::{CartItem, CartState};
use crate::error::CommerceError;
use crate::ids::ItemId;
use crate::money::Money;

/// Storage key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "hope-services-cart";

const CART_STORAGE_VERSION: u32 = 0;

/// On-disk envelope: `{"state": {"items": [...]}, "version": 0}`.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCart {
    state: CartState,
    #[serde(default)]
    version: u32,
}

/// Handle returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&CartState) + Send + Sync>;

/// The shopper's cart, written through to a [`Cache`] on every change.
///
/// Each mutation runs against a copy of the state, persists the copy and
/// only then replaces the in-memory state, so a storage failure leaves the
/// cart as it was. Listeners run after every mutation that changed
/// something.
pub struct CartStore {
    cache: Cache,
    state: CartState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Load the cart from `cache`, starting empty if nothing is stored.
    ///
    /// A stored cart that cannot be decoded is discarded with a warning.
    pub fn open(cache: Cache) -> Result<Self, CommerceError> {
        let mut state = match cache.get::<PersistedCart>(CART_STORAGE_KEY) {
            Ok(Some(persisted)) => persisted.state,
            Ok(None) => CartState::new(),
            Err(CacheError::SerializeError(e)) => {
                tracing::warn!(error = %e, "discarding unreadable persisted cart");
                CartState::new()
            }
            Err(e) => return Err(e.into()),
        };

        if state.normalize() {
            tracing::warn!("persisted cart contained invalid entries, repaired");
        }
        tracing::debug!(items = state.len(), "cart loaded");

        Ok(Self {
            cache,
            state,
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }

    /// Add `quantity` units of `item`, merging with an existing entry.
    pub fn add_item(&mut self, item: CartItem, quantity: i64) -> Result<(), CommerceError> {
        let id = item.id;
        self.mutate(|state| state.add_item(item, quantity).map(|()| true))?;
        tracing::debug!(item = %id, quantity, "cart item added");
        Ok(())
    }

    /// Remove the entry for `id`; no-op if absent.
    pub fn remove_item(&mut self, id: ItemId) -> Result<(), CommerceError> {
        if self.mutate(|state| Ok(state.remove_item(id)))? {
            tracing::debug!(item = %id, "cart item removed");
        }
        Ok(())
    }

    /// Set the quantity for `id`; zero or below removes the entry.
    pub fn update_quantity(&mut self, id: ItemId, quantity: i64) -> Result<(), CommerceError> {
        if self.mutate(|state| Ok(state.update_quantity(id, quantity)))? {
            tracing::debug!(item = %id, quantity, "cart quantity updated");
        }
        Ok(())
    }

    /// Empty the cart. Clearing an empty cart writes nothing.
    pub fn clear_cart(&mut self) -> Result<(), CommerceError> {
        let cleared = self.mutate(|state| {
            let changed = !state.is_empty();
            state.clear();
            Ok(changed)
        })?;
        if cleared {
            tracing::debug!("cart cleared");
        }
        Ok(())
    }

    /// Sum of price times quantity.
    pub fn total(&self) -> Result<Money, CommerceError> {
        self.state.total()
    }

    /// Sum of quantities.
    pub fn item_count(&self) -> i64 {
        self.state.item_count()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.state.items
    }

    pub fn get(&self, id: ItemId) -> Option<&CartItem> {
        self.state.get(id)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn state(&self) -> &CartState {
        &self.state
    }

    /// Register a listener called with the new state after each change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&CartState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    fn mutate<F>(&mut self, op: F) -> Result<bool, CommerceError>
    where
        F: FnOnce(&mut CartState) -> Result<bool, CommerceError>,
    {
        let mut next = self.state.clone();
        if !op(&mut next)? {
            return Ok(false);
        }

        let persisted = PersistedCart {
            state: next,
            version: CART_STORAGE_VERSION,
        };
        self.cache.set(CART_STORAGE_KEY, &persisted)?;
        self.state = persisted.state;

        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
        Ok(true)
    }
}
