//! Change notification bus.
//!
//! Two broadcast channels make every cart mutation observable:
//!
//! - `local` carries [`CartUpdated`] signals for components in the same
//!   context (a header badge updating after an add-to-cart click).
//! - `cross_context` carries [`StorageEvent`]s: synthetic events published by
//!   this context's engine, and native events the storage area forwards for
//!   writes made in other contexts.
//!
//! Both are invalidation hints. The channels are independent and may be
//! observed in either order, so subscribers must re-read the cart through the
//! store instead of trusting a payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::config::{DEFAULT_BUS_CAPACITY, MAX_BUS_CAPACITY};
use crate::storage::{ContextId, StorageEvent};

/// The mutation that produced a local signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartOperation {
    Add,
    UpdateQuantity,
    Remove,
    Clear,
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::UpdateQuantity => "update_quantity",
            Self::Remove => "remove",
            Self::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Same-context signal raised after a successful cart write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartUpdated {
    pub context: ContextId,
    pub operation: CartOperation,
    pub at: DateTime<Utc>,
}

/// A receiver for same-context signals.
pub type LocalReceiver = broadcast::Receiver<CartUpdated>;

/// A receiver for storage-change events.
pub type CrossContextReceiver = broadcast::Receiver<StorageEvent>;

/// Publish/subscribe hub for one context.
///
/// Cloning shares the same channels.
#[derive(Clone)]
pub struct NotificationBus {
    local: broadcast::Sender<CartUpdated>,
    cross_context: broadcast::Sender<StorageEvent>,
}

impl NotificationBus {
    /// Create a bus whose channels buffer `capacity` signals per subscriber.
    ///
    /// The capacity is clamped to `1..=MAX_BUS_CAPACITY`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BUS_CAPACITY);
        let (local, _) = broadcast::channel(capacity);
        let (cross_context, _) = broadcast::channel(capacity);
        Self {
            local,
            cross_context,
        }
    }

    /// Subscribe to same-context signals.
    #[must_use]
    pub fn subscribe_local(&self) -> LocalReceiver {
        self.local.subscribe()
    }

    /// Subscribe to storage-change events.
    #[must_use]
    pub fn subscribe_cross_context(&self) -> CrossContextReceiver {
        self.cross_context.subscribe()
    }

    /// Raise a same-context signal. Returns the number of subscribers reached.
    pub fn publish_local(&self, signal: CartUpdated) -> usize {
        let reached = self.local.send(signal).unwrap_or(0);
        trace!(reached, "published local cart signal");
        reached
    }

    /// Raise a storage-change event. Returns the number of subscribers reached.
    pub fn publish_cross_context(&self, event: StorageEvent) -> usize {
        let reached = self.cross_context.send(event).unwrap_or(0);
        trace!(reached, "published cross-context storage event");
        reached
    }

    /// The cross-context sender, for registering with a storage area.
    #[must_use]
    pub const fn cross_context_sender(&self) -> &broadcast::Sender<StorageEvent> {
        &self.cross_context
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("local_subscribers", &self.local.receiver_count())
            .field("cross_context_subscribers", &self.cross_context.receiver_count())
            .finish()
    }
}
