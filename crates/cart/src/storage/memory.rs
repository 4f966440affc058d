//! In-process storage profile shared between contexts.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use super::{ContextId, StorageArea, StorageError, StorageEvent, StorageEventKind};

/// A listener registered by one context.
struct Listener {
    context: ContextId,
    sender: broadcast::WeakSender<StorageEvent>,
}

/// State shared by every handle opened on the same profile.
struct Profile {
    items: RwLock<HashMap<String, String>>,
    listeners: RwLock<Vec<Listener>>,
    quota: Option<usize>,
}

impl Profile {
    /// Deliver a native event to every context except the writer.
    ///
    /// Listeners whose bus has been dropped are pruned.
    fn dispatch(&self, event: &StorageEvent) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|listener| {
            let Some(sender) = listener.sender.upgrade() else {
                return false;
            };
            if listener.context != event.context {
                // No subscribers yet is fine; the bus may gain some later.
                let _ = sender.send(event.clone());
            }
            true
        });
    }
}

/// In-memory storage area.
///
/// Cloning a handle keeps the same context. Use [`MemoryStorage::open_context`]
/// to simulate another tab on the same profile.
#[derive(Clone)]
pub struct MemoryStorage {
    profile: Arc<Profile>,
    context: ContextId,
}

impl MemoryStorage {
    /// Create a new, empty profile without a quota and open a context on it.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a new, empty profile limited to `quota` bytes of keys and values.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self::build(Some(quota))
    }

    fn build(quota: Option<usize>) -> Self {
        Self {
            profile: Arc::new(Profile {
                items: RwLock::new(HashMap::new()),
                listeners: RwLock::new(Vec::new()),
                quota,
            }),
            context: ContextId::new(),
        }
    }

    /// Open another context on the same profile.
    #[must_use]
    pub fn open_context(&self) -> Self {
        Self {
            profile: Arc::clone(&self.profile),
            context: ContextId::new(),
        }
    }

    /// Remove every key, notifying other contexts with a keyless event.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the profile lock is poisoned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let was_empty = {
            let mut items = self.profile.items.write().map_err(poisoned)?;
            let was_empty = items.is_empty();
            items.clear();
            was_empty
        };

        if !was_empty {
            self.profile.dispatch(&StorageEvent {
                key: None,
                old_value: None,
                new_value: None,
                context: self.context,
                kind: StorageEventKind::Native,
                at: Utc::now(),
            });
        }
        Ok(())
    }

    /// Bytes currently used by keys and values.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.profile
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    fn notify(&self, key: &str, old_value: Option<String>, new_value: Option<String>) {
        if old_value == new_value {
            return;
        }
        debug!(key, context = %self.context, "dispatching native storage event");
        self.profile.dispatch(&StorageEvent {
            key: Some(key.to_string()),
            old_value,
            new_value,
            context: self.context,
            kind: StorageEventKind::Native,
            at: Utc::now(),
        });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("context", &self.context)
            .field("quota", &self.profile.quota)
            .finish_non_exhaustive()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StorageError {
    StorageError::Unavailable("storage lock poisoned".to_string())
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.profile.items.read().map_err(poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = {
            let mut items = self.profile.items.write().map_err(poisoned)?;

            if let Some(quota) = self.profile.quota {
                let others: usize = items
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let attempted = others + key.len() + value.len();
                if attempted > quota {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        attempted,
                        quota,
                    });
                }
            }

            items.insert(key.to_string(), value.to_string())
        };

        self.notify(key, old_value, Some(value.to_string()));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let old_value = self.profile.items.write().map_err(poisoned)?.remove(key);
        if old_value.is_some() {
            self.notify(key, old_value, None);
        }
        Ok(())
    }

    fn context(&self) -> ContextId {
        self.context
    }

    fn add_listener(&self, listener: &broadcast::Sender<StorageEvent>) {
        self.profile
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener {
                context: self.context,
                sender: listener.downgrade(),
            });
    }
}
