//! Wire protocol for cross-context state sync.

use micro_local_store_core::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message kind tag carried in the `type` field.
pub const MESSAGE_KIND: &str = "micro-local-store";

/// Target origin policy used when posting to the parent.
pub const TARGET_ORIGIN_ANY: &str = "*";

/// Message from an embedded context to its top-level context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    /// Full state snapshot of the store `id`.
    #[serde(rename = "micro-local-store")]
    StateUpdate { id: String, state: State },
}

impl SyncMessage {
    /// Create a state update message.
    #[must_use]
    pub fn state_update(id: impl Into<String>, state: State) -> Self {
        Self::StateUpdate {
            id: id.into(),
            state,
        }
    }

    /// Parse an inbound payload.
    ///
    /// Returns `None` for anything that is not a well-formed message of
    /// this protocol's kind.
    #[must_use]
    pub fn parse(data: &Value) -> Option<Self> {
        Self::deserialize(data).ok()
    }

    /// Store identifier the message is tagged with.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::StateUpdate { id, .. } => id,
        }
    }

    /// Take the carried state if the message belongs to store `id`.
    #[must_use]
    pub fn into_state_for(self, id: &str) -> Option<State> {
        match self {
            Self::StateUpdate { id: msg_id, state } if msg_id == id => Some(state),
            Self::StateUpdate { .. } => None,
        }
    }
}
