//! In-memory cart contents and the pure operations on them.

use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::error::CommerceError;
use crate::ids::ItemId;
use crate::money::Money;

/// Ordered cart entries, at most one per item id, every quantity at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of `item`.
    ///
    /// An existing entry with the same id keeps its name and price and has
    /// its quantity incremented; otherwise `item` is appended with
    /// `quantity` as its quantity.
    pub fn add_item(&mut self, item: CartItem, quantity: i64) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::Overflow)?;
        } else {
            self.items.push(CartItem { quantity, ..item });
        }
        Ok(())
    }

    /// Remove the entry for `id`. Returns whether anything was removed.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    /// Overwrite the quantity for `id`; zero or below removes the entry.
    ///
    /// Returns whether the state changed. Unknown ids are ignored.
    pub fn update_quantity(&mut self, id: ItemId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove_item(id);
        }
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) if item.quantity != quantity => {
                item.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price times quantity.
    pub fn total(&self) -> Result<Money, CommerceError> {
        let lines = self
            .items
            .iter()
            .map(CartItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Money::try_sum(lines)
    }

    /// Sum of quantities.
    pub fn item_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, i| acc.saturating_add(i.quantity))
    }

    pub fn get(&self, id: ItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Repair state loaded from storage.
    ///
    /// Drops entries with quantity below 1 and folds duplicate ids into the
    /// first occurrence. Returns whether anything had to change.
    pub(crate) fn normalize(&mut self) -> bool {
        let mut changed = false;
        let mut merged: Vec<CartItem> = Vec::with_capacity(self.items.len());

        for item in self.items.drain(..) {
            if item.quantity < 1 {
                changed = true;
                continue;
            }
            match merged.iter_mut().find(|m| m.id == item.id) {
                Some(existing) => {
                    changed = true;
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => merged.push(item),
            }
        }

        self.items = merged;
        changed
    }
}
