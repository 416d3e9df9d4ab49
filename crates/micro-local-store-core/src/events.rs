//! Inbound host notifications.

use serde_json::Value;

/// An event the host delivers to a context.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A structured message posted to this context.
    Message {
        /// Payload as posted by the sender.
        data: Value,
        /// Sender origin, when the host reports one.
        origin: Option<String>,
    },
    /// The context regained focus.
    Focus,
    /// Persistent storage was changed by another same-origin context.
    ///
    /// `key` is `None` when the whole storage area was cleared.
    StorageChanged { key: Option<String> },
}

impl HostEvent {
    /// Message event with a known sender origin.
    #[must_use]
    pub fn message(data: Value, origin: impl Into<String>) -> Self {
        Self::Message {
            data,
            origin: Some(origin.into()),
        }
    }

    /// Storage change event for a single key.
    #[must_use]
    pub fn storage_changed(key: impl Into<String>) -> Self {
        Self::StorageChanged {
            key: Some(key.into()),
        }
    }
}
