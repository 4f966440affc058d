//! Cart snapshot and line types.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s with at most one line per
//! product. It serializes as a bare JSON array, which is the persisted layout:
//!
//! ```json
//! [{"id": 1, "name": "Dried Pineapple", "price": 10.0, "image": "/img/1.jpg", "quantity": 2, "total": 20.0}]
//! ```
//!
//! Aggregates ([`Cart::item_count`], [`Cart::grand_total`]) are always
//! recomputed from `price * quantity` and never read from the stored `total`.
//! Money arithmetic saturates at the `Decimal` range instead of overflowing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::order::OrderItem;
use super::price::numeric;

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog product ID.
    pub id: ProductId,
    /// Display name, snapshotted at add-time.
    pub name: String,
    /// Unit price.
    #[serde(with = "numeric")]
    pub price: Decimal,
    /// Display image reference, snapshotted at add-time.
    pub image: String,
    /// Number of units, always at least 1.
    pub quantity: u32,
    /// `price * quantity`, kept for display only.
    #[serde(with = "numeric")]
    pub total: Decimal,
}

impl CartLine {
    /// Create a line and compute its total.
    #[must_use]
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Decimal,
        image: impl Into<String>,
        quantity: u32,
    ) -> Self {
        let mut line = Self {
            id,
            name: name.into(),
            price,
            image: image.into(),
            quantity,
            total: Decimal::ZERO,
        };
        line.recompute_total();
        line
    }

    /// The derived line total, independent of the stored `total` field.
    ///
    /// Saturates at `Decimal::MAX` (or `MIN` for a negative price).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    /// Overwrite the quantity and recompute the stored total.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.recompute_total();
    }

    /// Bring the stored total back in line with `price * quantity`.
    pub fn recompute_total(&mut self) {
        self.total = self.line_total();
    }
}

/// An ordered set of cart lines keyed by product ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines, merging any duplicate product IDs and
    /// dropping zero-quantity lines.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::empty();
        for line in lines.into_iter().filter(|l| l.quantity > 0) {
            cart.merge_line(line);
        }
        cart
    }

    /// All lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.id == id)
    }

    /// Add a line, accumulating into an existing line for the same product.
    ///
    /// When the product is already present only the quantity changes; the
    /// name, price and image snapshotted on the first add are kept.
    pub fn merge_line(&mut self, line: CartLine) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.id == line.id) {
            existing.set_quantity(existing.quantity.saturating_add(line.quantity));
        } else {
            self.lines.push(line);
        }
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// A quantity of zero removes the line. Returns `false` if no line
    /// matches `id`.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id).is_some();
        }
        match self.lines.iter_mut().find(|l| &l.id == id) {
            Some(line) => {
                line.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Remove the line for a product, returning it if present.
    pub fn remove(&mut self, id: &ProductId) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| &l.id == id)?;
        Some(self.lines.remove(index))
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of `price * quantity` across all lines.
    ///
    /// Stored `total` fields are ignored so a stale or hand-edited blob still
    /// produces the right figure. Saturates at the `Decimal` range.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Map lines to `{product_id, quantity}` pairs for order submission.
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|l| OrderItem {
                product_id: l.id.clone(),
                quantity: l.quantity,
            })
            .collect()
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<T: IntoIterator<Item = CartLine>>(iter: T) -> Self {
        Self::from_lines(iter)
    }
}
