//! Cart mutation engine.
//!
//! Every operation is one synchronous read-modify-write pass:
//!
//! 1. read the current cart through the store,
//! 2. compute the new snapshot,
//! 3. write it back,
//! 4. on a successful write, raise one local signal and one synthetic
//!    cross-context event.
//!
//! Operations take `&self` and never await, so two mutations in the same
//! context cannot interleave. Writes from different contexts are
//! last-writer-wins; nothing is merged.
//!
//! Invalid input is coerced rather than rejected: a non-numeric price becomes
//! zero and a non-positive add quantity becomes one. The order endpoint
//! recomputes the authoritative total at checkout.

use chrono::Utc;
use np_cart_core::{Cart, CartLine, ProductId, ProductInput};
use rust_decimal::Decimal;
use tracing::{instrument, warn};

use crate::bus::{CartOperation, CartUpdated, NotificationBus};
use crate::error::add_breadcrumb;
use crate::storage::{StorageArea, StorageEvent, StorageEventKind};
use crate::store::{CartStore, StoreError};

/// Result of a cart mutation.
///
/// `cart` is the computed snapshot whether or not it was persisted; a
/// `write_error` means the change will not survive past this view.
#[derive(Debug)]
pub struct MutationOutcome {
    pub cart: Cart,
    pub write_error: Option<StoreError>,
}

impl MutationOutcome {
    /// Whether the new snapshot reached storage.
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        self.write_error.is_none()
    }

    /// Take the computed cart, discarding any write error.
    #[must_use]
    pub fn into_cart(self) -> Cart {
        self.cart
    }

    /// Turn the outcome into a `Result` for callers that must not lose writes.
    ///
    /// # Errors
    ///
    /// Returns the write error if the snapshot was not persisted.
    pub fn into_result(self) -> Result<Cart, StoreError> {
        match self.write_error {
            Some(e) => Err(e),
            None => Ok(self.cart),
        }
    }
}

/// Applies cart mutations against a store and announces them on a bus.
pub struct CartEngine<S> {
    store: CartStore<S>,
    bus: NotificationBus,
}

impl<S> Clone for CartEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bus: self.bus.clone(),
        }
    }
}

impl<S: StorageArea> CartEngine<S> {
    /// Create an engine writing through `store` and announcing on `bus`.
    #[must_use]
    pub const fn new(store: CartStore<S>, bus: NotificationBus) -> Self {
        Self { store, bus }
    }

    /// The store this engine writes through.
    #[must_use]
    pub const fn store(&self) -> &CartStore<S> {
        &self.store
    }

    /// The bus this engine announces on.
    #[must_use]
    pub const fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Read the current cart.
    #[must_use]
    pub fn read(&self) -> Cart {
        self.store.read()
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line for the same product accumulates; otherwise a new
    /// line is appended with the product's name, price and image.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&self, product: &ProductInput, quantity: i64) -> MutationOutcome {
        let quantity = add_quantity(quantity);
        let price = product.price.to_decimal().unwrap_or_else(|e| {
            warn!(error = %e, "product price is not numeric, using zero");
            Decimal::ZERO
        });

        let mut cart = self.store.read();
        cart.merge_line(CartLine::new(
            product.id.clone(),
            product.name.clone(),
            price,
            product.image.clone(),
            quantity,
        ));

        let product_id = product.id.to_string();
        let added = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[("product_id", product_id.as_str()), ("quantity", added.as_str())]),
        );
        self.commit(cart, CartOperation::Add)
    }

    /// Add a single unit of `product`.
    pub fn add_one(&self, product: &ProductInput) -> MutationOutcome {
        self.add_item(product, 1)
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// A quantity of zero or less removes the line. A missing product leaves
    /// the cart unchanged.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> MutationOutcome {
        if quantity <= 0 {
            return self.remove_item(product_id);
        }

        let mut cart = self.store.read();
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if !cart.set_quantity(product_id, quantity) {
            tracing::debug!("no line to update");
        }

        let id = product_id.to_string();
        let updated = quantity.to_string();
        add_breadcrumb(
            "cart",
            "Updated quantity",
            Some(&[("product_id", id.as_str()), ("quantity", updated.as_str())]),
        );
        self.commit(cart, CartOperation::UpdateQuantity)
    }

    /// Remove the line for `product_id`, if present.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub fn remove_item(&self, product_id: &ProductId) -> MutationOutcome {
        let mut cart = self.store.read();
        if cart.remove(product_id).is_none() {
            tracing::debug!("no line to remove");
        }

        let id = product_id.to_string();
        add_breadcrumb("cart", "Removed item", Some(&[("product_id", id.as_str())]));
        self.commit(cart, CartOperation::Remove)
    }

    /// Empty the cart by removing its storage key.
    #[instrument(skip(self))]
    pub fn clear(&self) -> MutationOutcome {
        let old_value = self.store.raw();
        add_breadcrumb("cart", "Cleared cart", None);

        match self.store.clear() {
            Ok(()) => {
                self.announce(CartOperation::Clear, old_value, None);
                MutationOutcome {
                    cart: Cart::empty(),
                    write_error: None,
                }
            }
            Err(e) => MutationOutcome {
                cart: Cart::empty(),
                write_error: Some(e),
            },
        }
    }

    /// Persist `cart` and announce it if the write succeeds.
    fn commit(&self, cart: Cart, operation: CartOperation) -> MutationOutcome {
        let old_value = self.store.raw();
        match self.store.write(&cart) {
            Ok(blob) => {
                self.announce(operation, old_value, Some(blob));
                MutationOutcome {
                    cart,
                    write_error: None,
                }
            }
            Err(e) => {
                warn!(%operation, "cart change not persisted, continuing with in-memory result");
                MutationOutcome {
                    cart,
                    write_error: Some(e),
                }
            }
        }
    }

    /// Raise exactly one signal on each channel.
    fn announce(
        &self,
        operation: CartOperation,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        let context = self.store.storage().context();
        let at = Utc::now();

        self.bus.publish_local(CartUpdated {
            context,
            operation,
            at,
        });
        self.bus.publish_cross_context(StorageEvent {
            key: Some(self.store.key().to_string()),
            old_value,
            new_value,
            context,
            kind: StorageEventKind::Synthetic,
            at,
        });
    }
}

/// Default a non-positive add quantity to one.
fn add_quantity(quantity: i64) -> u32 {
    if quantity <= 0 {
        warn!(quantity, "non-positive add quantity, using 1");
        return 1;
    }
    u32::try_from(quantity).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;

    fn engine() -> CartEngine<MemoryStorage> {
        CartEngine::new(
            CartStore::new(Arc::new(MemoryStorage::new()), "cart"),
            NotificationBus::new(16),
        )
    }

    fn product(id: i32, price: i64) -> ProductInput {
        ProductInput::new(id, format!("Product {id}"), price, format!("/img/{id}.jpg"))
    }

    #[test]
    fn test_add_accumulates_into_one_line() {
        let engine = engine();
        engine.add_item(&product(1, 10), 2);
        let cart = engine.add_item(&product(1, 10), 3).into_cart();

        assert_eq!(cart.len(), 1);
        let line = cart.get(&ProductId::new(1)).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.total, Decimal::from(50));
        assert_eq!(engine.read(), cart);
    }

    #[test]
    fn test_add_coerces_text_price() {
        let engine = engine();
        let input = ProductInput::new(2, "Pineapple Chips", "19990", "/img/2.jpg");
        engine.add_item(&input, 1);

        let raw = engine.store().raw().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(stored[0]["price"].is_number());
        assert_eq!(stored[0]["price"].as_f64(), Some(19990.0));
        assert_eq!(engine.read().get(&ProductId::new(2)).unwrap().price, Decimal::from(19990));
    }

    #[test]
    fn test_add_non_numeric_price_is_zero() {
        let engine = engine();
        let cart = engine
            .add_one(&ProductInput::new(3, "Mystery", "call us", ""))
            .into_cart();
        assert_eq!(cart.get(&ProductId::new(3)).unwrap().price, Decimal::ZERO);
    }

    #[test]
    fn test_add_non_positive_quantity_defaults_to_one() {
        let engine = engine();
        let cart = engine.add_item(&product(1, 10), 0).into_cart();
        assert_eq!(cart.get(&ProductId::new(1)).unwrap().quantity, 1);

        let cart = engine.add_item(&product(2, 10), -3).into_cart();
        assert_eq!(cart.get(&ProductId::new(2)).unwrap().quantity, 1);
    }

    #[test]
    fn test_add_keeps_first_snapshot() {
        let engine = engine();
        engine.add_one(&product(1, 10));
        let cart = engine
            .add_one(&ProductInput::new(1, "Renamed", 99, "/img/new.jpg"))
            .into_cart();

        let line = cart.get(&ProductId::new(1)).unwrap();
        assert_eq!(line.name, "Product 1");
        assert_eq!(line.price, Decimal::from(10));
        assert_eq!(line.total, Decimal::from(20));
    }

    #[test]
    fn test_update_quantity_overwrites() {
        let engine = engine();
        engine.add_item(&product(1, 10), 2);
        let cart = engine.update_quantity(&ProductId::new(1), 7).into_cart();

        let line = cart.get(&ProductId::new(1)).unwrap();
        assert_eq!(line.quantity, 7);
        assert_eq!(line.total, Decimal::from(70));
    }

    #[test]
    fn test_update_quantity_zero_or_negative_removes() {
        let engine = engine();
        engine.add_one(&product(1, 10));
        engine.add_one(&product(2, 10));

        engine.update_quantity(&ProductId::new(1), 0);
        let cart = engine.update_quantity(&ProductId::new(2), -5).into_cart();

        assert!(cart.get(&ProductId::new(1)).is_none());
        assert!(cart.get(&ProductId::new(2)).is_none());
        assert!(engine.read().is_empty());
    }

    #[test]
    fn test_update_missing_is_noop() {
        let engine = engine();
        engine.add_item(&product(1, 10), 2);
        let before = engine.read();

        let outcome = engine.update_quantity(&ProductId::new(9), 4);
        assert!(outcome.is_durable());
        assert_eq!(outcome.cart, before);
    }

    #[test]
    fn test_remove_item() {
        let engine = engine();
        engine.add_one(&product(1, 10));
        engine.add_one(&product(2, 5));

        let cart = engine.remove_item(&ProductId::new(1)).into_cart();
        assert_eq!(cart.len(), 1);
        assert!(cart.get(&ProductId::new(2)).is_some());

        let cart = engine.remove_item(&ProductId::new(1)).into_cart();
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_clear_resets_aggregates() {
        let engine = engine();
        engine.add_item(&product(1, 10), 2);

        let cart = engine.clear().into_cart();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.grand_total(), Decimal::ZERO);
        assert_eq!(engine.read(), Cart::empty());
        assert_eq!(engine.store().raw(), None);
    }

    #[test]
    fn test_each_mutation_signals_once_per_channel() {
        let engine = engine();
        let mut local = engine.bus().subscribe_local();
        let mut cross = engine.bus().subscribe_cross_context();

        engine.add_item(&product(1, 10), 1);

        let signal = local.try_recv().unwrap();
        assert_eq!(signal.operation, CartOperation::Add);
        assert!(local.try_recv().is_err());

        let event = cross.try_recv().unwrap();
        assert_eq!(event.kind, StorageEventKind::Synthetic);
        assert_eq!(event.key.as_deref(), Some("cart"));
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value, engine.store().raw());
        assert!(cross.try_recv().is_err());
    }

    #[test]
    fn test_clear_signal_has_no_new_value() {
        let engine = engine();
        engine.add_one(&product(1, 10));
        let mut cross = engine.bus().subscribe_cross_context();

        engine.clear();

        let event = cross.try_recv().unwrap();
        assert!(event.old_value.is_some());
        assert_eq!(event.new_value, None);
    }

    #[test]
    fn test_failed_write_returns_cart_without_signals() {
        let engine = CartEngine::new(
            CartStore::new(Arc::new(MemoryStorage::with_quota(16)), "cart"),
            NotificationBus::new(16),
        );
        let mut local = engine.bus().subscribe_local();
        let mut cross = engine.bus().subscribe_cross_context();

        let outcome = engine.add_item(&product(1, 10), 2);

        assert!(!outcome.is_durable());
        assert!(outcome.write_error.as_ref().unwrap().is_quota_exceeded());
        assert_eq!(outcome.cart.item_count(), 2);
        assert!(engine.read().is_empty());
        assert!(local.try_recv().is_err());
        assert!(cross.try_recv().is_err());
    }

    #[test]
    fn test_into_result_surfaces_write_error() {
        let engine = CartEngine::new(
            CartStore::new(Arc::new(MemoryStorage::with_quota(16)), "cart"),
            NotificationBus::new(16),
        );

        assert!(engine.add_item(&product(1, 10), 1).into_result().is_err());
        assert!(engine.clear().into_result().unwrap().is_empty());
    }

    #[test]
    fn test_add_huge_price_saturates_instead_of_panicking() {
        let engine = engine();
        let input = ProductInput::new(1, "Gold Pineapple", "79228162514264337593543950335", "");

        let outcome = engine.add_item(&input, 2);

        assert!(outcome.is_durable());
        assert_eq!(outcome.cart.grand_total(), Decimal::MAX);
        assert_eq!(engine.read().item_count(), 2);
    }

    #[test]
    fn test_text_product_ids() {
        let engine = engine();
        engine.add_item(&ProductInput::new("SKU-1", "a", 4, ""), 1);
        engine.add_item(&ProductInput::new("SKU-2", "b", 1, ""), 1);
        engine.update_quantity(&ProductId::new("SKU-1"), 3);
        let cart = engine.remove_item(&ProductId::new("SKU-2")).into_cart();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.grand_total(), Decimal::from(12));
        assert_eq!(engine.read(), cart);
    }
}
