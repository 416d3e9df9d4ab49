//! Role-dependent transport wiring between contexts.

use micro_local_store_core::{
    ExecutionContext, Role, State,
    context::resolve_origin,
    traits::{ChannelError, ConfigError, ContextId},
};
use serde_json::Value;
use url::Url;

use crate::protocol::{SyncMessage, TARGET_ORIGIN_ANY};

/// Allowed URLs and their resolved origins, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins {
    entries: Vec<(Url, String)>,
}

impl AllowedOrigins {
    /// Resolve configured URLs; an empty list means "the current location".
    ///
    /// # Errors
    /// Returns error if any URL is not absolute or has an opaque origin.
    pub fn resolve(urls: &[String], location: &Url) -> Result<Self, ConfigError> {
        let entries = if urls.is_empty() {
            vec![resolve_origin(location.as_str())?]
        } else {
            urls.iter()
                .map(|url| resolve_origin(url))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(Self { entries })
    }

    /// Resolved origins in configuration order.
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, o)| o.as_str())
    }

    /// Allowed entries whose origin differs from `current`.
    pub fn cross_origin(&self, current: &str) -> impl Iterator<Item = (&Url, &str)> {
        self.entries
            .iter()
            .filter(move |(_, o)| o != current)
            .map(|(url, o)| (url, o.as_str()))
    }
}

/// A hidden frame provisioned by the top-level context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    /// Host identifier of the frame's context.
    pub id: ContextId,
    /// URL the frame was navigated to.
    pub url: Url,
    /// Origin the frame runs in.
    pub origin: String,
}

/// Transport bridge for one store instance.
///
/// The top-level role owns hidden cross-origin frames and filters inbound
/// messages by kind and store id; the embedded role forwards snapshots to
/// its parent.
pub struct TransportBridge {
    context: ExecutionContext,
    allowed: AllowedOrigins,
    frames: Vec<FrameHandle>,
}

impl TransportBridge {
    /// Create a bridge. No frames are provisioned until
    /// [`provision_frames`](Self::provision_frames) runs.
    #[must_use]
    pub const fn new(context: ExecutionContext, allowed: AllowedOrigins) -> Self {
        Self {
            context,
            allowed,
            frames: Vec::new(),
        }
    }

    /// The context this bridge runs in.
    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Allowed origins.
    #[must_use]
    pub const fn allowed(&self) -> &AllowedOrigins {
        &self.allowed
    }

    /// Frames provisioned so far.
    #[must_use]
    pub fn frames(&self) -> &[FrameHandle] {
        &self.frames
    }

    /// Create one hidden frame per cross-origin allowed URL.
    ///
    /// Does nothing in an embedded context or once frames exist.
    ///
    /// # Errors
    /// Returns error if the host fails to create a frame.
    pub fn provision_frames(&mut self) -> Result<&[FrameHandle], ChannelError> {
        let Role::TopLevel { frames } = &self.context.role else {
            return Ok(&self.frames);
        };
        if !self.frames.is_empty() {
            return Ok(&self.frames);
        }

        let current = self.context.origin();
        for (url, origin) in self.allowed.cross_origin(&current) {
            let id = frames.create_hidden_frame(url)?;
            tracing::debug!(frame = %id, %origin, "provisioned hidden frame");
            self.frames.push(FrameHandle {
                id,
                url: url.clone(),
                origin: origin.to_string(),
            });
        }

        Ok(&self.frames)
    }

    /// Validate an inbound message for store `id`.
    ///
    /// Returns the carried state only when the receiver is top-level and the
    /// payload is a sync message tagged with `id`. The sender is not checked.
    #[must_use]
    pub fn accept(&self, id: &str, data: &Value) -> Option<State> {
        if !self.context.is_top_level() {
            tracing::trace!("embedded context ignores inbound sync messages");
            return None;
        }

        let state = SyncMessage::parse(data)?.into_state_for(id);
        if state.is_none() {
            tracing::trace!(store = id, "dropping sync message for another store");
        }
        state
    }

    /// Send the full state to the top-level context.
    ///
    /// Returns `false` without sending when this is the top-level context.
    ///
    /// # Errors
    /// Returns error if the message cannot be encoded or posted.
    pub fn forward_to_parent(&self, id: &str, state: &State) -> Result<bool, ChannelError> {
        let Role::Embedded { parent } = &self.context.role else {
            return Ok(false);
        };

        let payload = serde_json::to_value(SyncMessage::state_update(id, state.clone()))?;
        parent.post_message(payload, TARGET_ORIGIN_ANY)?;
        tracing::debug!(store = id, "forwarded state to parent");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use micro_local_store_core::{FrameHost, ParentChannel};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    struct RecordingFrames {
        created: Mutex<Vec<Url>>,
    }

    impl FrameHost for RecordingFrames {
        fn create_hidden_frame(&self, url: &Url) -> Result<ContextId, ChannelError> {
            self.created.lock().unwrap().push(url.clone());
            Ok(Uuid::new_v4())
        }
    }

    #[derive(Default)]
    struct RecordingParent {
        posted: Mutex<Vec<(Value, String)>>,
    }

    impl ParentChannel for RecordingParent {
        fn post_message(&self, payload: Value, target_origin: &str) -> Result<(), ChannelError> {
            self.posted
                .lock()
                .unwrap()
                .push((payload, target_origin.to_string()));
            Ok(())
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn top_bridge(allowed: &[&str]) -> (TransportBridge, Arc<RecordingFrames>) {
        let frames = Arc::new(RecordingFrames::default());
        let location = url("https://shop.example/checkout");
        let allowed = AllowedOrigins::resolve(&urls(allowed), &location).unwrap();
        let context = ExecutionContext::top_level(location, frames.clone());
        (TransportBridge::new(context, allowed), frames)
    }

    #[test]
    fn test_default_allowed_is_current_location() {
        let location = url("https://shop.example/checkout");
        let allowed = AllowedOrigins::resolve(&[], &location).unwrap();
        assert_eq!(allowed.origins().collect::<Vec<_>>(), ["https://shop.example"]);
    }

    #[test]
    fn test_provisions_only_cross_origin_frames() {
        let (mut bridge, frames) =
            top_bridge(&["https://shop.example/", "https://cart.example/frame"]);

        let handles = bridge.provision_frames().unwrap().to_vec();

        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].origin, "https://cart.example");
        assert_eq!(
            *frames.created.lock().unwrap(),
            [url("https://cart.example/frame")]
        );
    }

    #[test]
    fn test_provision_is_one_shot() {
        let (mut bridge, frames) = top_bridge(&["https://cart.example/"]);
        bridge.provision_frames().unwrap();
        bridge.provision_frames().unwrap();
        assert_eq!(frames.created.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_embedded_provisions_nothing_and_forwards() {
        let parent = Arc::new(RecordingParent::default());
        let location = url("https://cart.example/frame");
        let allowed =
            AllowedOrigins::resolve(&urls(&["https://shop.example/"]), &location).unwrap();
        let mut bridge =
            TransportBridge::new(ExecutionContext::embedded(location, parent.clone()), allowed);

        assert!(bridge.provision_frames().unwrap().is_empty());

        let state = json!({"items": [1]}).as_object().cloned().unwrap();
        assert!(bridge.forward_to_parent("cart", &state).unwrap());

        let posted = parent.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(
            posted[0].0,
            json!({"type": "micro-local-store", "id": "cart", "state": {"items": [1]}})
        );
        assert_eq!(posted[0].1, "*");
    }

    #[test]
    fn test_top_level_does_not_forward() {
        let (bridge, _) = top_bridge(&[]);
        assert!(!bridge.forward_to_parent("cart", &State::new()).unwrap());
    }

    #[test]
    fn test_accept_filters() {
        let (bridge, _) = top_bridge(&["https://shop.example/", "https://cart.example/"]);
        let data = json!({"type": "micro-local-store", "id": "cart", "state": {"n": 1}});

        assert_eq!(
            bridge.accept("cart", &data),
            Some(json!({"n": 1}).as_object().cloned().unwrap())
        );
        assert!(bridge.accept("wishlist", &data).is_none());
        assert!(bridge.accept("cart", &json!({"type": "ping"})).is_none());
        assert!(
            bridge
                .accept("cart", &json!({"type": "micro-local-store", "id": "cart"}))
                .is_none()
        );
    }

    #[test]
    fn test_accepts_frames_outside_allowed_list() {
        // Default allow-list is the page's own origin; embedded widgets still sync.
        let (bridge, _) = top_bridge(&[]);
        let data = json!({"type": "micro-local-store", "id": "cart", "state": {"items": [1]}});

        assert_eq!(
            bridge.accept("cart", &data),
            Some(json!({"items": [1]}).as_object().cloned().unwrap())
        );
    }

    #[test]
    fn test_embedded_rejects_inbound() {
        let location = url("https://cart.example/");
        let allowed = AllowedOrigins::resolve(&[], &location).unwrap();
        let bridge = TransportBridge::new(
            ExecutionContext::embedded(location, Arc::new(RecordingParent::default())),
            allowed,
        );
        let data = json!({"type": "micro-local-store", "id": "cart", "state": {"n": 1}});

        assert!(bridge.accept("cart", &data).is_none());
    }
}
