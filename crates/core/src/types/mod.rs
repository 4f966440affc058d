//! Core types for the local cart.
//!
//! This module provides type-safe wrappers for cart domain concepts.

pub mod cart;
pub mod id;
pub mod order;
pub mod price;
pub mod product;

pub use cart::{Cart, CartLine};
pub use id::*;
pub use order::{OrderItem, OrderRequest};
pub use price::{PriceError, PriceInput, coerce_price};
pub use product::ProductInput;
