//! Product input accepted when adding to the cart.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::PriceInput;

/// The catalog fields snapshotted into a cart line at add-time.
///
/// The price is kept in its raw form here; the mutation engine coerces it
/// before any arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub id: ProductId,
    pub name: String,
    pub price: PriceInput,
    pub image: String,
}

impl ProductInput {
    /// Create a new product input.
    #[must_use]
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: impl Into<PriceInput>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price: price.into(),
            image: image.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_catalog_record() {
        let json = r#"{"id": 2, "name": "Dried Pineapple", "price": "19990", "image": "/img/2.jpg", "stock": 4}"#;
        let product: ProductInput = serde_json::from_str(json).unwrap();

        assert_eq!(product.id, ProductId::new(2));
        assert_eq!(product.price, PriceInput::Text("19990".to_string()));
        assert_eq!(product.image, "/img/2.jpg");
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"id": 2, "name": "Dried Pineapple", "price": 5}"#;
        assert!(serde_json::from_str::<ProductInput>(json).is_err());
    }
}
