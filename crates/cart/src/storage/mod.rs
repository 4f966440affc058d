//! Persistent key-value storage areas.
//!
//! A [`StorageArea`] is the host's local storage: string keys mapped to string
//! blobs, scoped to one profile. Each handle belongs to one execution context
//! (a tab or window), identified by a [`ContextId`].
//!
//! # Native events
//!
//! When one context writes, the storage area delivers a [`StorageEvent`] to
//! every *other* context that registered a listener. The writing context never
//! receives its own native event; the notification bus covers that gap with a
//! synthetic event.
//!
//! # Implementations
//!
//! - [`MemoryStorage`] - in-process profile shared between contexts, with
//!   native event fan-out and an optional byte quota
//! - [`FileStorage`] - one file per key in a directory, with an optional
//!   directory-wide quota; no native events

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the storage area's quota.
    #[error("Quota exceeded writing {key}: {attempted} bytes (quota {quota})")]
    QuotaExceeded {
        key: String,
        attempted: usize,
        quota: usize,
    },

    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be stored by this backend.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// The storage area is not usable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Identifier for one execution context (tab, window, process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Generate a fresh context ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a storage event came to be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageEventKind {
    /// Delivered by the storage area for a write made in another context.
    Native,
    /// Published by the writing context on its own bus.
    Synthetic,
}

/// A storage-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// Changed key; `None` when the whole area was cleared.
    pub key: Option<String>,
    /// Blob before the change.
    pub old_value: Option<String>,
    /// Blob after the change; `None` when the key was removed.
    pub new_value: Option<String>,
    /// Context that performed the write.
    pub context: ContextId,
    pub kind: StorageEventKind,
    pub at: DateTime<Utc>,
}

impl StorageEvent {
    /// Whether this event could affect `key`.
    #[must_use]
    pub fn concerns(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|k| k == key)
    }
}

/// A context's handle on a persistent key-value storage area.
pub trait StorageArea: Send + Sync {
    /// Read the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the write.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the removal.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// The context this handle writes on behalf of.
    fn context(&self) -> ContextId;

    /// Register a sink for native events from other contexts.
    ///
    /// Backends without cross-context delivery ignore the listener.
    fn add_listener(&self, listener: &broadcast::Sender<StorageEvent>) {
        let _ = listener;
    }
}
