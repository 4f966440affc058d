//! Reader helper that turns bus signals into fresh cart snapshots.

use np_cart_core::Cart;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::bus::{CrossContextReceiver, LocalReceiver, NotificationBus};
use crate::storage::StorageArea;
use crate::store::CartStore;

/// Watches both bus channels and re-reads the cart on every signal.
///
/// Signal payloads are never trusted; each wake-up reads the store. A lagged
/// receiver counts as a signal since the cart has changed at least once.
pub struct CartWatcher<S> {
    store: CartStore<S>,
    local: Option<LocalReceiver>,
    cross_context: Option<CrossContextReceiver>,
}

impl<S: StorageArea> CartWatcher<S> {
    /// Subscribe to `bus` and read through `store`.
    #[must_use]
    pub fn new(store: CartStore<S>, bus: &NotificationBus) -> Self {
        Self {
            store,
            local: Some(bus.subscribe_local()),
            cross_context: Some(bus.subscribe_cross_context()),
        }
    }

    /// Read the current cart.
    #[must_use]
    pub fn current(&self) -> Cart {
        self.store.read()
    }

    /// Wait for the next relevant signal, then return a fresh snapshot.
    ///
    /// Storage events for other keys are skipped. Returns `None` once both
    /// channels have closed.
    pub async fn changed(&mut self) -> Option<Cart> {
        loop {
            let woke = match (self.local.as_mut(), self.cross_context.as_mut()) {
                (None, None) => return None,
                (Some(local), None) => Wake::Local(local.recv().await.map(|_| ())),
                (None, Some(cross)) => {
                    Wake::Cross(cross.recv().await.map(|e| e.concerns(self.store.key())))
                }
                (Some(local), Some(cross)) => {
                    tokio::select! {
                        r = local.recv() => Wake::Local(r.map(|_| ())),
                        r = cross.recv() => Wake::Cross(r.map(|e| e.concerns(self.store.key()))),
                    }
                }
            };

            match woke {
                Wake::Local(Ok(())) | Wake::Cross(Ok(true)) => return Some(self.current()),
                Wake::Cross(Ok(false)) => {}
                Wake::Local(Err(RecvError::Lagged(n))) | Wake::Cross(Err(RecvError::Lagged(n))) => {
                    debug!(skipped = n, "cart watcher lagged, re-reading");
                    return Some(self.current());
                }
                Wake::Local(Err(RecvError::Closed)) => self.local = None,
                Wake::Cross(Err(RecvError::Closed)) => self.cross_context = None,
            }
        }
    }
}

/// Which channel woke the watcher, and whether the signal is relevant.
enum Wake {
    Local(Result<(), RecvError>),
    Cross(Result<bool, RecvError>),
}
