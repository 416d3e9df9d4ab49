//! Per-context store instance.

use std::sync::{Arc, PoisonError, RwLock};

use futures::StreamExt;
use micro_local_store_core::{
    ChangeFeed, ExecutionContext, HostEvent, PersistentStorage, State,
    state::{self, storage_key},
};
use micro_local_store_transport::{AllowedOrigins, FrameHandle, TransportBridge};
use tokio::sync::broadcast;

use crate::{StoreConfig, StoreError};

/// Change listener. Registration and removal go by `Arc` identity.
pub type Listener = Arc<dyn Fn(&State) + Send + Sync>;

/// Key-value state kept in sync with every context sharing its identifier.
///
/// In the top-level context the store provisions hidden frames for the
/// other allowed origins and merges the snapshots they post. In an embedded
/// context it follows same-origin storage changes and pushes every loaded
/// or updated snapshot to the top-level context.
pub struct Store<S: PersistentStorage> {
    id: String,
    key: String,
    storage: S,
    bridge: TransportBridge,
    state: RwLock<State>,
    listeners: RwLock<Vec<Listener>>,
    feed: ChangeFeed,
}

impl<S: PersistentStorage> Store<S> {
    /// Create a store and load its persisted state.
    ///
    /// # Errors
    /// Returns error if the config is invalid, or if the host fails while
    /// loading, persisting, forwarding or provisioning frames.
    pub fn new(
        config: StoreConfig,
        context: ExecutionContext,
        storage: S,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let allowed = AllowedOrigins::resolve(&config.allowed_urls, &context.location)?;
        let key = storage_key(&config.id);

        let mut store = Self {
            id: config.id,
            key,
            storage,
            bridge: TransportBridge::new(context, allowed),
            state: RwLock::new(State::new()),
            listeners: RwLock::new(Vec::new()),
            feed: ChangeFeed::new(),
        };

        store.reload()?;
        store.forward_to_parent()?;
        store.bridge.provision_frames()?;

        tracing::debug!(
            store = %store.id,
            top_level = store.is_top_level(),
            frames = store.bridge.frames().len(),
            "store loaded"
        );
        Ok(store)
    }

    /// Store identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Persistence key derived from the identifier.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this store runs in the top-level context.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.bridge.context().is_top_level()
    }

    /// Resolved allowed origins.
    #[must_use]
    pub const fn allowed_origins(&self) -> &AllowedOrigins {
        self.bridge.allowed()
    }

    /// Hidden frames provisioned by the top-level context.
    #[must_use]
    pub fn frames(&self) -> &[FrameHandle] {
        self.bridge.frames()
    }

    /// Current snapshot. No I/O.
    #[must_use]
    pub fn get_state(&self) -> State {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge `partial` into the state, persist it and notify listeners.
    ///
    /// An embedded store also forwards the merged state to its parent.
    ///
    /// # Errors
    /// Returns error if persisting or forwarding fails.
    pub fn set_state(&self, partial: &State) -> Result<(), StoreError> {
        self.apply(partial)?;
        self.forward_to_parent()
    }

    /// Register a listener; it receives the full state after every change.
    ///
    /// Listeners run after the state lock is released. Calls made from one
    /// thread notify in call order; concurrent writers on different threads
    /// may interleave their notifications. Use [`watch`](Self::watch) or
    /// [`subscribe`](Self::subscribe) for a stream ordered like the writes.
    pub fn on_change(&self, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Remove every registration of `listener`. Unknown listeners are ignored.
    pub fn off_change(&self, listener: &Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Re-read the persisted state and merge it in.
    ///
    /// Listeners are notified even when nothing changed. Returns the raw
    /// loaded snapshot, or `None` when nothing usable is persisted.
    ///
    /// # Errors
    /// Returns error if reading or persisting fails.
    pub fn reload(&self) -> Result<Option<State>, StoreError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            tracing::debug!(store = %self.id, "no persisted state");
            return Ok(None);
        };
        let Some(loaded) = state::from_persisted(&raw) else {
            tracing::warn!(store = %self.id, "ignoring malformed persisted state");
            return Ok(None);
        };

        self.apply(&loaded)?;
        Ok(Some(loaded))
    }

    /// Send the full state to the top-level context. No-op when top-level.
    ///
    /// # Errors
    /// Returns error if the message cannot be posted.
    pub fn forward_to_parent(&self) -> Result<(), StoreError> {
        self.bridge.forward_to_parent(&self.id, &self.get_state())?;
        Ok(())
    }

    /// Handle an event from the host.
    ///
    /// Top-level: accepts sync messages and reloads on focus.
    /// Embedded: reloads and forwards on every storage change, whatever the
    /// key.
    /// Anything else is ignored.
    ///
    /// # Errors
    /// Returns error if the resulting reload, persist or forward fails.
    pub fn handle_event(&self, event: HostEvent) -> Result<(), StoreError> {
        match event {
            HostEvent::Message { data, origin } => {
                if let Some(state) = self.bridge.accept(&self.id, &data) {
                    tracing::debug!(store = %self.id, ?origin, "merging state from frame");
                    self.apply(&state)?;
                }
            }
            HostEvent::Focus if self.is_top_level() => {
                self.reload()?;
                self.forward_to_parent()?;
            }
            HostEvent::StorageChanged { key } if !self.is_top_level() => {
                tracing::trace!(store = %self.id, ?key, "storage changed, reloading");
                self.reload()?;
                self.forward_to_parent()?;
            }
            other => tracing::trace!(store = %self.id, event = ?other, "event ignored"),
        }
        Ok(())
    }

    /// Receiver of every new snapshot.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<State> {
        self.feed.subscribe()
    }

    /// Stream of the current snapshot followed by every new one.
    #[must_use]
    pub fn watch(&self) -> futures::stream::BoxStream<'static, State> {
        // Publishing happens under the write lock, so nothing slips between
        // this snapshot and the subscription.
        let current = self.state.read().unwrap_or_else(PoisonError::into_inner);
        self.feed.watch_from(current.clone())
    }

    /// Feed a stream of host events into this store on a tokio task.
    ///
    /// Errors are logged and the loop keeps going.
    pub fn spawn_event_loop<E>(self: Arc<Self>, events: E) -> tokio::task::JoinHandle<()>
    where
        S: 'static,
        E: futures::Stream<Item = HostEvent> + Send + 'static,
    {
        tokio::spawn(async move {
            tokio::pin!(events);

            while let Some(event) = events.next().await {
                if let Err(e) = self.handle_event(event) {
                    tracing::error!(store = %self.id, "event handling failed: {e}");
                }
            }
        })
    }

    fn apply(&self, partial: &State) -> Result<State, StoreError> {
        let next = {
            let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let next = state::merge(&current, partial);
            self.storage
                .set_item(&self.key, &state::to_persisted(&next))?;
            *current = next.clone();
            self.feed.publish(&next);
            next
        };

        self.notify(&next);
        Ok(next)
    }

    fn notify(&self, state: &State) {
        // Snapshot so listeners may register or remove listeners.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(state);
        }
    }
}
