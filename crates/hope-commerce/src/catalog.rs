//! Product catalog models and operations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::CatalogGateway;
use crate::error::CommerceError;
use crate::ids::ItemId;
use crate::money::Money;

/// Generic message when the product list cannot be loaded.
pub const GENERIC_CATALOG_FAILURE: &str = "Failed to load products";

/// Generic message when a product cannot be created.
pub const GENERIC_CREATE_ITEM_FAILURE: &str = "Failed to create item";

const MAX_NAME_LEN: usize = 255;
const MAX_CATEGORY_LEN: usize = 100;
const MAX_SKU_LEN: usize = 100;

/// A product as listed by the API. `quantity` is the stock on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl InventoryItem {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Payload for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Money,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

impl NewInventoryItem {
    pub fn new(name: impl Into<String>, price: Money, quantity: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            quantity,
            category: None,
            sku: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    /// Check the same limits the server enforces.
    pub fn validate(&self) -> Result<(), CommerceError> {
        let name_len = self.name.chars().count();
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(CommerceError::ValidationError(format!(
                "name must be between 1 and {} characters",
                MAX_NAME_LEN
            )));
        }
        if self.price.is_negative() {
            return Err(CommerceError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }
        if self.quantity < 0 {
            return Err(CommerceError::ValidationError(
                "quantity must not be negative".to_string(),
            ));
        }
        if let Some(category) = &self.category {
            if category.chars().count() > MAX_CATEGORY_LEN {
                return Err(CommerceError::ValidationError(format!(
                    "category must be at most {} characters",
                    MAX_CATEGORY_LEN
                )));
            }
        }
        if let Some(sku) = &self.sku {
            if sku.chars().count() > MAX_SKU_LEN {
                return Err(CommerceError::ValidationError(format!(
                    "sku must be at most {} characters",
                    MAX_SKU_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Fetch the product list, optionally filtered by category.
pub async fn list_items(
    gateway: &dyn CatalogGateway,
    category: Option<&str>,
) -> Result<Vec<InventoryItem>, CommerceError> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let items = gateway.list_items(category).await.map_err(|e| {
        tracing::warn!(error = %e, "listing products failed");
        e
    })?;
    tracing::debug!(count = items.len(), category = ?category, "products listed");
    Ok(items)
}

/// Validate and create a product.
pub async fn create_item(
    gateway: &dyn CatalogGateway,
    item: &NewInventoryItem,
) -> Result<InventoryItem, CommerceError> {
    item.validate()?;
    let created = gateway.create_item(item).await.map_err(|e| {
        tracing::warn!(error = %e, "creating product failed");
        e
    })?;
    tracing::info!(item = %created.id, name = %created.name, "product created");
    Ok(created)
}
