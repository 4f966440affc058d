//! Order submission payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::Cart;
use super::id::ProductId;

/// One `{product_id, quantity}` pair sent to the order endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A finalized cart snapshot submitted for fulfillment.
///
/// The total is informational; the order endpoint recomputes the
/// authoritative amount from its own catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

impl From<&Cart> for OrderRequest {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.order_items(),
            total: cart.grand_total(),
        }
    }
}
