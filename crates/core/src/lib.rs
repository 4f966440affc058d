//! Naked Pineapple Cart Core - Shared cart types.
//!
//! This crate provides the data model used by the local cart subsystem:
//! - `np-cart` - Storage adapter, mutation engine and notification bus
//! - `np-cart-cli` - Command-line inspector for a file-backed cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. Aggregates are computed from a cart snapshot on
//! demand and never stored.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, product input, cart lines and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
