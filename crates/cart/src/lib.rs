//! Naked Pineapple local cart.
//!
//! Keeps one shopping cart consistent across independent execution contexts
//! (tabs, windows, processes) and across components inside one context,
//! without a server-side session. The cart lives in a local key-value storage
//! area and is re-read on every change notification; there is no in-memory
//! cache to drift.
//!
//! # Architecture
//!
//! - [`storage`] - Storage areas with native cross-context change events
//! - [`store`] - Durable store adapter: read/write/clear the cart blob
//! - [`engine`] - Mutation engine: add, update quantity, remove, clear
//! - [`bus`] - Notification bus with `local` and `cross_context` channels
//! - [`watcher`] - Reader helper that re-reads on every signal
//! - [`context`] - Per-context wiring of the above
//! - [`checkout`] - Order submission that clears the cart on success
//!
//! # Example
//!
//! ```rust
//! use np_cart::config::CartSettings;
//! use np_cart::context::CartContext;
//! use np_cart::storage::MemoryStorage;
//! use np_cart_core::ProductInput;
//!
//! let storage = MemoryStorage::new();
//! let tab = CartContext::new(storage.clone(), &CartSettings::default());
//! let other_tab = CartContext::new(storage.open_context(), &CartSettings::default());
//!
//! tab.engine().add_item(&ProductInput::new(1, "Dried Pineapple", "19.99", "/img/1.jpg"), 2);
//!
//! assert_eq!(other_tab.store().read().item_count(), 2);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bus;
pub mod checkout;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod storage;
pub mod store;
pub mod watcher;

pub use bus::{CartOperation, CartUpdated, NotificationBus};
pub use checkout::{CheckoutError, HttpOrderSubmitter, OrderConfirmation, OrderSubmitter, checkout};
pub use config::{CartConfig, CartSettings};
pub use context::CartContext;
pub use engine::{CartEngine, MutationOutcome};
pub use error::{Error, Result};
pub use store::{CartStore, StoreError};
pub use watcher::CartWatcher;
