//! One execution context's cart wiring.

use std::sync::Arc;

use tracing::info;

use crate::bus::NotificationBus;
use crate::config::CartSettings;
use crate::engine::CartEngine;
use crate::storage::{ContextId, StorageArea};
use crate::store::CartStore;
use crate::watcher::CartWatcher;

/// Store, bus and engine for one context (a tab, window or process).
///
/// Creating a context attaches its bus to the storage area, so writes made by
/// other contexts arrive on this context's cross-context channel.
///
/// This struct is cheaply cloneable via `Arc` and can be handed to every
/// component that reads or mutates the cart.
pub struct CartContext<S> {
    inner: Arc<CartContextInner<S>>,
}

impl<S> Clone for CartContext<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CartContextInner<S> {
    id: ContextId,
    engine: CartEngine<S>,
}

impl<S: StorageArea> CartContext<S> {
    /// Wire a context over `storage`.
    #[must_use]
    pub fn new(storage: S, settings: &CartSettings) -> Self {
        let id = storage.context();
        let storage = Arc::new(storage);
        let bus = NotificationBus::new(settings.bus_capacity);
        storage.add_listener(bus.cross_context_sender());

        let store = CartStore::new(storage, settings.storage_key.clone());
        info!(context = %id, key = %settings.storage_key, "cart context opened");

        Self {
            inner: Arc::new(CartContextInner {
                id,
                engine: CartEngine::new(store, bus),
            }),
        }
    }

    /// This context's identifier.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// The mutation engine.
    #[must_use]
    pub fn engine(&self) -> &CartEngine<S> {
        &self.inner.engine
    }

    /// The store adapter.
    #[must_use]
    pub fn store(&self) -> &CartStore<S> {
        self.inner.engine.store()
    }

    /// The notification bus.
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        self.inner.engine.bus()
    }

    /// A new watcher subscribed to this context's bus.
    #[must_use]
    pub fn watch(&self) -> CartWatcher<S> {
        CartWatcher::new(self.store().clone(), self.bus())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use np_cart_core::ProductInput;

    use super::*;
    use crate::storage::{MemoryStorage, StorageEventKind};

    #[test]
    fn test_native_event_reaches_other_context_only() {
        let settings = CartSettings::default();
        let storage = MemoryStorage::new();
        let tab_a = CartContext::new(storage.clone(), &settings);
        let tab_b = CartContext::new(storage.open_context(), &settings);

        let mut cross_a = tab_a.bus().subscribe_cross_context();
        let mut cross_b = tab_b.bus().subscribe_cross_context();

        tab_a.engine().add_one(&ProductInput::new(1, "a", 10, ""));

        let own = cross_a.try_recv().unwrap();
        assert_eq!(own.kind, StorageEventKind::Synthetic);
        assert!(cross_a.try_recv().is_err());

        let remote = cross_b.try_recv().unwrap();
        assert_eq!(remote.kind, StorageEventKind::Native);
        assert_eq!(remote.context, tab_a.id());
        assert!(cross_b.try_recv().is_err());
    }

    #[test]
    fn test_local_signal_stays_in_context() {
        let settings = CartSettings::default();
        let storage = MemoryStorage::new();
        let tab_a = CartContext::new(storage.clone(), &settings);
        let tab_b = CartContext::new(storage.open_context(), &settings);
        let mut local_b = tab_b.bus().subscribe_local();

        tab_a.engine().add_one(&ProductInput::new(1, "a", 10, ""));

        assert!(local_b.try_recv().is_err());
        assert_eq!(tab_b.store().read().item_count(), 1);
    }

    #[test]
    fn test_clones_share_engine() {
        let context = CartContext::new(MemoryStorage::new(), &CartSettings::default());
        let clone = context.clone();

        context.engine().add_one(&ProductInput::new(1, "a", 10, ""));
        assert_eq!(clone.id(), context.id());
        assert_eq!(clone.store().read().item_count(), 1);
    }
}
