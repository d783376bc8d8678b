//! Order payloads and the orders the API returns.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::cart::CartState;
use crate::ids::{ItemId, OrderId, OrderItemId, UserId};
use crate::money::Money;

/// One requested line of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub inventory_item_id: ItemId,
    pub quantity: i64,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderLine>,
    pub shipping_address: Option<String>,
}

impl OrderRequest {
    /// One line per cart entry, in cart order.
    pub fn from_cart(cart: &CartState, shipping_address: Option<String>) -> Self {
        Self {
            items: cart
                .items
                .iter()
                .map(|item| OrderLine {
                    inventory_item_id: item.id,
                    quantity: item.quantity,
                })
                .collect(),
            shipping_address: shipping_address.filter(|a| !a.trim().is_empty()),
        }
    }

    /// Hex SHA-256 digest of what this request orders.
    ///
    /// Two requests share a fingerprint exactly when they carry the same
    /// lines in the same order and the same shipping address.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.items.len() as u64).to_be_bytes());
        for line in &self.items {
            hasher.update(line.inventory_item_id.get().to_be_bytes());
            hasher.update(line.quantity.to_be_bytes());
        }
        match &self.shipping_address {
            Some(address) => {
                hasher.update([1u8]);
                hasher.update(address.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Order lifecycle as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    /// A status this client does not know about.
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => OrderStatus::Pending,
            "processing" => OrderStatus::Processing,
            "completed" => OrderStatus::Completed,
            "cancelled" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchased line with the price locked in at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub inventory_item_id: ItemId,
    pub quantity: i64,
    pub price_at_purchase: Money,
}

/// Background work the server queued for an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderJobs {
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub inventory_sync: Option<String>,
}

/// An order created by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Money,
    pub status: OrderStatus,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub jobs: Option<OrderJobs>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;

    #[test]
    fn test_request_from_cart_keeps_order() {
        let mut cart = CartState::new();
        cart.add_item(CartItem::new(ItemId::new(5), "Soap", Money::from_cents(300)), 2)
            .unwrap();
        cart.add_item(CartItem::new(ItemId::new(2), "Rice", Money::from_cents(1000)), 1)
            .unwrap();

        let request = OrderRequest::from_cart(&cart, Some("1 Main St".to_string()));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": [
                    { "inventory_item_id": 5, "quantity": 2 },
                    { "inventory_item_id": 2, "quantity": 1 },
                ],
                "shipping_address": "1 Main St",
            })
        );
    }

    #[test]
    fn test_fingerprint_tracks_contents() {
        let mut cart = CartState::new();
        cart.add_item(CartItem::new(ItemId::new(1), "Rice", Money::from_cents(1000)), 1)
            .unwrap();
        let base = OrderRequest::from_cart(&cart, None);
        assert_eq!(base.fingerprint(), OrderRequest::from_cart(&cart, None).fingerprint());
        assert_eq!(base.fingerprint().len(), 64);

        let shipped = OrderRequest::from_cart(&cart, Some("1 Main St".to_string()));
        assert_ne!(base.fingerprint(), shipped.fingerprint());

        cart.add_item(CartItem::new(ItemId::new(2), "Beans", Money::from_cents(550)), 3)
            .unwrap();
        assert_ne!(base.fingerprint(), OrderRequest::from_cart(&cart, None).fingerprint());

        assert!(cart.update_quantity(ItemId::new(2), 0));
        assert_eq!(base.fingerprint(), OrderRequest::from_cart(&cart, None).fingerprint());
    }

    #[test]
    fn test_blank_address_is_sent_as_null() {
        let request = OrderRequest::from_cart(&CartState::new(), Some("   ".to_string()));
        assert_eq!(request.shipping_address, None);
    }

    #[test]
    fn test_order_from_api_json() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 31,
            "user_id": 4,
            "total_amount": "25.50",
            "status": "pending",
            "shipping_address": null,
            "created_at": "2024-05-02T10:15:30",
            "items": [{
                "id": 70,
                "order_id": 31,
                "inventory_item_id": 2,
                "quantity": 2,
                "price_at_purchase": "10.00",
            }],
            "jobs": { "receipt": "job-1", "inventory_sync": "job-2" },
        }))
        .unwrap();

        assert_eq!(order.id, OrderId::new(31));
        assert_eq!(order.total_amount, Money::from_cents(2550));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items[0].price_at_purchase, Money::from_cents(1000));
        assert_eq!(order.jobs.unwrap().receipt.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: OrderStatus = serde_json::from_str("\"refunded\"").unwrap();
        assert_eq!(status, OrderStatus::Other("refunded".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"refunded\"");
    }
}
