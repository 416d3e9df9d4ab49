//! Broadcast of state snapshots for async consumers.

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::State;

/// Default number of snapshots a slow subscriber may fall behind.
const FEED_CAPACITY: usize = 256;

/// Live broadcast of every new snapshot.
///
/// The feed holds no snapshot of its own. The owner of the state publishes
/// and starts watch streams under its state lock, so a watcher's first item
/// and the live items that follow never disagree with the owner.
pub struct ChangeFeed {
    sender: broadcast::Sender<State>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// Broadcast a new snapshot.
    pub fn publish(&self, state: &State) {
        let _ = self.sender.send(state.clone()); // no receivers is fine
    }

    /// Receiver for live snapshots only.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<State> {
        self.sender.subscribe()
    }

    /// Stream that yields `current`, then live updates.
    ///
    /// Snapshots missed by a lagging subscriber are skipped.
    #[must_use]
    pub fn watch_from(&self, current: State) -> futures::stream::BoxStream<'static, State> {
        let rx = self.sender.subscribe();
        let first = futures::stream::once(futures::future::ready(current));

        let live = BroadcastStream::new(rx).filter_map(|res| async move {
            match res {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::trace!("change feed subscriber lagged: {e}");
                    None
                }
            }
        });

        first.chain(live).boxed()
    }
}
