//! Durable store adapter for the cart blob.
//!
//! The adapter is the only code that touches the serialized representation.
//! It never fails a read: a missing key, a corrupt blob, or an unreadable
//! backend all come back as an empty cart. Write failures are logged and
//! returned as values so callers can carry on with the in-memory result.

use std::sync::Arc;

use np_cart_core::{Cart, CartLine, PriceInput, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::report_absorbed;
use crate::storage::{StorageArea, StorageError};

/// Errors that can occur when persisting the cart.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend rejected the operation.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The cart could not be serialized.
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the failure was the storage quota.
    #[must_use]
    pub const fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Storage(StorageError::QuotaExceeded { .. }))
    }
}

/// A line as found in storage, before normalization.
///
/// Only `id`, `price` and `quantity` are required; the stored `total` is
/// ignored and recomputed.
#[derive(Deserialize)]
struct StoredLine {
    id: ProductId,
    #[serde(default)]
    name: String,
    price: PriceInput,
    #[serde(default)]
    image: String,
    quantity: i64,
}

impl StoredLine {
    fn into_line(self) -> Option<CartLine> {
        if self.quantity <= 0 {
            warn!(
                product_id = %self.id,
                quantity = self.quantity,
                "dropping stored line with non-positive quantity"
            );
            return None;
        }
        let quantity = u32::try_from(self.quantity).unwrap_or(u32::MAX);
        let price = self.price.to_decimal().unwrap_or_else(|e| {
            warn!(product_id = %self.id, error = %e, "stored price is not numeric, using zero");
            Decimal::ZERO
        });
        Some(CartLine::new(self.id, self.name, price, self.image, quantity))
    }
}

/// Decode a stored blob, normalizing lines.
///
/// The blob must be a JSON array; anything else is corrupt. Each element is
/// decoded on its own, so one unreadable line is dropped without losing the
/// rest. Duplicate product IDs are merged and zero-quantity lines dropped, so
/// the result always satisfies the cart invariants.
fn decode(raw: &str) -> Result<Cart, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<StoredLine>(value) {
            Ok(line) => line.into_line(),
            Err(e) => {
                warn!(index, error = %e, "dropping unreadable stored line");
                None
            }
        })
        .collect())
}

/// Reads and writes the cart under a single storage key.
pub struct CartStore<S> {
    storage: Arc<S>,
    key: String,
}

impl<S> Clone for CartStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            key: self.key.clone(),
        }
    }
}

impl<S: StorageArea> CartStore<S> {
    /// Create a store over `storage` using `key`.
    #[must_use]
    pub fn new(storage: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The storage key holding the cart.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying storage handle.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The raw stored blob, if any. Backend errors read as `None`.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        match self.storage.get_item(&self.key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read cart storage");
                None
            }
        }
    }

    /// Read the current cart.
    ///
    /// A missing key, an unparseable blob, or a backend failure all produce an
    /// empty cart.
    #[must_use]
    pub fn read(&self) -> Cart {
        let Some(raw) = self.raw() else {
            return Cart::empty();
        };

        match decode(&raw) {
            Ok(cart) => cart,
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored cart is corrupt, treating as empty");
                Cart::empty()
            }
        }
    }

    /// Serialize and store `cart`, returning the blob that was written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if serialization fails or the backend rejects
    /// the write. The failure has already been logged and reported.
    pub fn write(&self, cart: &Cart) -> Result<String, StoreError> {
        let result = serde_json::to_string(cart)
            .map_err(StoreError::from)
            .and_then(|blob| {
                self.storage.set_item(&self.key, &blob)?;
                Ok(blob)
            });

        match &result {
            Ok(blob) => {
                debug!(key = %self.key, lines = cart.len(), bytes = blob.len(), "cart written");
            }
            Err(e) => report_absorbed(e, "cart write failed"),
        }
        result
    }

    /// Remove the cart key entirely.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend rejects the removal. The failure
    /// has already been logged and reported.
    pub fn clear(&self) -> Result<(), StoreError> {
        let result = self
            .storage
            .remove_item(&self.key)
            .map_err(StoreError::from);

        match &result {
            Ok(()) => debug!(key = %self.key, "cart cleared"),
            Err(e) => report_absorbed(e, "cart clear failed"),
        }
        result
    }
}
