//! Cart line entries.

use serde::{Deserialize, Serialize};

use crate::catalog::InventoryItem;
use crate::error::CommerceError;
use crate::ids::ItemId;
use crate::money::Money;

/// One product in the cart.
///
/// Persisted carts written by other clients may carry extra product fields;
/// they are ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub name: String,
    pub price: Money,
    pub quantity: i64,
}

impl CartItem {
    /// A single unit of a product.
    pub fn new(id: ItemId, name: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            quantity: 1,
        }
    }

    /// Build a cart entry from a catalog product.
    ///
    /// Products with no stock cannot be added.
    pub fn from_inventory(item: &InventoryItem) -> Result<Self, CommerceError> {
        if !item.in_stock() {
            return Err(CommerceError::OutOfStock(item.name.clone()));
        }
        Ok(Self::new(item.id, item.name.clone(), item.price))
    }

    /// Price times quantity.
    pub fn line_total(&self) -> Result<Money, CommerceError> {
        self.price
            .checked_mul(self.quantity)
            .ok_or(CommerceError::Overflow)
    }
}
