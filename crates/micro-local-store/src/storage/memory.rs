//! In-memory, origin-partitioned persistent storage.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use micro_local_store_core::{
    HostEvent, PersistentStorage,
    traits::{ContextId, StorageError},
};
use micro_local_store_transport::loopback::Window;
use tokio::sync::mpsc;

struct Watcher {
    context: ContextId,
    events: mpsc::UnboundedSender<HostEvent>,
}

#[derive(Default)]
struct Partition {
    items: HashMap<String, String>,
    watchers: Vec<Watcher>,
}

/// In-memory storage shared by every context of a simulated host.
///
/// Each origin has its own partition. A write that changes a value queues
/// [`HostEvent::StorageChanged`] for every other context attached to the
/// same origin, never for the writer itself. Data is lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    partitions: RwLock<HashMap<String, Partition>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a context to the partition for `origin`.
    ///
    /// `events` receives change notifications caused by other contexts.
    ///
    /// # Errors
    /// Returns error if the storage lock is poisoned.
    pub fn attach(
        self: &Arc<Self>,
        origin: impl Into<String>,
        context: ContextId,
        events: mpsc::UnboundedSender<HostEvent>,
    ) -> Result<StorageArea, StorageError> {
        let origin = origin.into();
        self.partitions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .entry(origin.clone())
            .or_default()
            .watchers
            .push(Watcher { context, events });

        Ok(StorageArea {
            storage: Arc::clone(self),
            origin,
            context,
        })
    }

    /// Attach a loopback window to the partition for its origin.
    ///
    /// # Errors
    /// Returns error if the storage lock is poisoned.
    pub fn attach_window(self: &Arc<Self>, window: &Window) -> Result<StorageArea, StorageError> {
        self.attach(window.origin(), window.id, window.notifier())
    }

    /// Raw value under `key` in the partition for `origin`.
    ///
    /// # Errors
    /// Returns error if the storage lock is poisoned.
    pub fn raw(&self, origin: &str, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .partitions
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(origin)
            .and_then(|p| p.items.get(key).cloned()))
    }
}

/// One context's view of its origin partition.
pub struct StorageArea {
    storage: Arc<MemoryStorage>,
    origin: String,
    context: ContextId,
}

impl StorageArea {
    /// Origin this area belongs to.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl PersistentStorage for StorageArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.raw(&self.origin, key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut partitions = self
            .storage
            .partitions
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let partition = partitions.entry(self.origin.clone()).or_default();
        let previous = partition.items.insert(key.to_string(), value.to_string());
        if previous.as_deref() == Some(value) {
            return Ok(());
        }

        // Closed windows drop out of the watcher list.
        partition.watchers.retain(|w| {
            w.context == self.context || w.events.send(HostEvent::storage_changed(key)).is_ok()
        });

        Ok(())
    }
}
