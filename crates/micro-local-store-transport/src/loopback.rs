//! In-process host connecting several browsing contexts.
//!
//! Every window gets an unbounded event queue; messages posted to a parent
//! and focus changes are delivered through it on a later turn, the way a
//! browser event loop would.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock, Weak},
};

use micro_local_store_core::{
    ExecutionContext, FrameHost, HostEvent, ParentChannel,
    traits::{ChannelError, ContextId},
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use url::Url;
use uuid::Uuid;

use crate::protocol::TARGET_ORIGIN_ANY;

struct WindowEntry {
    origin: String,
    events: mpsc::UnboundedSender<HostEvent>,
}

/// In-process host for top-level windows and their hidden frames.
#[derive(Default)]
pub struct LoopbackHost {
    windows: RwLock<HashMap<ContextId, WindowEntry>>,
    pending_frames: Mutex<Vec<Window>>,
}

impl LoopbackHost {
    /// Create a new host.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open a top-level window at `location`.
    #[must_use]
    pub fn open_window(self: &Arc<Self>, location: Url) -> Window {
        let id = Uuid::new_v4();
        let frames = Arc::new(LoopbackFrames {
            host: Arc::downgrade(self),
            top: id,
        });
        self.register(id, ExecutionContext::top_level(location, frames))
    }

    fn open_frame(self: &Arc<Self>, top: ContextId, location: Url) -> Result<ContextId, ChannelError> {
        if !self.read_windows().contains_key(&top) {
            return Err(ChannelError::NotFound(top));
        }

        let id = Uuid::new_v4();
        let parent = Arc::new(LoopbackParent {
            host: Arc::downgrade(self),
            top,
            origin: location.origin().ascii_serialization(),
        });
        let frame = self.register(id, ExecutionContext::embedded(location, parent));

        self.pending_frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
        Ok(id)
    }

    fn register(&self, id: ContextId, context: ExecutionContext) -> Window {
        let (tx, rx) = mpsc::unbounded_channel();
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                WindowEntry {
                    origin: context.origin(),
                    events: tx.clone(),
                },
            );

        Window {
            id,
            context,
            events: WindowEvents { rx },
            notifier: tx,
        }
    }

    fn read_windows(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<ContextId, WindowEntry>> {
        self.windows.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the frames created since the last call, so a store can be
    /// mounted in each.
    pub fn take_frames(&self) -> Vec<Window> {
        std::mem::take(
            &mut *self
                .pending_frames
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Queue an event for a window.
    ///
    /// # Errors
    /// Returns error if the window is unknown or its queue is closed.
    pub fn dispatch(&self, target: ContextId, event: HostEvent) -> Result<(), ChannelError> {
        let windows = self.read_windows();
        let entry = windows.get(&target).ok_or(ChannelError::NotFound(target))?;
        entry.events.send(event).map_err(|_| ChannelError::Closed)
    }

    /// Signal that a window regained focus.
    ///
    /// # Errors
    /// Returns error if the window is unknown or its queue is closed.
    pub fn focus(&self, target: ContextId) -> Result<(), ChannelError> {
        self.dispatch(target, HostEvent::Focus)
    }

    /// Forget a window. Later messages to it fail with `NotFound`.
    pub fn close(&self, id: ContextId) {
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// A browsing context opened on a [`LoopbackHost`].
pub struct Window {
    /// Host identifier.
    pub id: ContextId,
    /// Descriptor to hand to a store.
    pub context: ExecutionContext,
    /// Inbound event queue.
    pub events: WindowEvents,
    notifier: mpsc::UnboundedSender<HostEvent>,
}

impl Window {
    /// Origin of this window.
    #[must_use]
    pub fn origin(&self) -> String {
        self.context.origin()
    }

    /// Sender into this window's event queue, for storage change fan-out.
    #[must_use]
    pub fn notifier(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.notifier.clone()
    }

    /// Split into the context descriptor and the event queue.
    #[must_use]
    pub fn into_parts(self) -> (ExecutionContext, WindowEvents) {
        (self.context, self.events)
    }
}

/// Receiving end of a window's event queue.
pub struct WindowEvents {
    rx: mpsc::UnboundedReceiver<HostEvent>,
}

impl WindowEvents {
    /// Next queued event, without waiting.
    pub fn try_next(&mut self) -> Option<HostEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event.
    pub async fn next(&mut self) -> Option<HostEvent> {
        self.rx.recv().await
    }

    /// Convert into a stream for an event loop task.
    #[must_use]
    pub fn into_stream(self) -> UnboundedReceiverStream<HostEvent> {
        UnboundedReceiverStream::new(self.rx)
    }
}

struct LoopbackFrames {
    host: Weak<LoopbackHost>,
    top: ContextId,
}

impl FrameHost for LoopbackFrames {
    fn create_hidden_frame(&self, url: &Url) -> Result<ContextId, ChannelError> {
        let host = self.host.upgrade().ok_or(ChannelError::Closed)?;
        host.open_frame(self.top, url.clone())
    }
}

struct LoopbackParent {
    host: Weak<LoopbackHost>,
    top: ContextId,
    origin: String,
}

impl ParentChannel for LoopbackParent {
    fn post_message(&self, payload: Value, target_origin: &str) -> Result<(), ChannelError> {
        let host = self.host.upgrade().ok_or(ChannelError::Closed)?;
        let windows = host.read_windows();
        let parent = windows.get(&self.top).ok_or(ChannelError::NotFound(self.top))?;

        if target_origin != TARGET_ORIGIN_ANY && target_origin != parent.origin {
            tracing::trace!(%target_origin, "target origin mismatch, message dropped");
            return Ok(());
        }

        parent
            .events
            .send(HostEvent::Message {
                data: payload,
                origin: Some(self.origin.clone()),
            })
            .map_err(|_| ChannelError::Closed)
    }
}
