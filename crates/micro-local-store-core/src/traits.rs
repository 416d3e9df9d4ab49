//! Host collaborator traits and their errors.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Browsing context identifier.
pub type ContextId = Uuid;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("A store ID is required")]
    MissingId,
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Messaging or frame provisioning error.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel closed")]
    Closed,
    #[error("Context not found: {0}")]
    NotFound(ContextId),
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Origin-scoped persistent key-value storage.
///
/// Writes are visible to every context sharing the origin; the host is
/// expected to notify those other contexts with
/// [`HostEvent::StorageChanged`](crate::HostEvent::StorageChanged).
pub trait PersistentStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: PersistentStorage + ?Sized> PersistentStorage for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }
}

/// Send-only channel from an embedded context to its top-level context.
pub trait ParentChannel: Send + Sync {
    /// Post a structured message. Delivery is asynchronous and unacknowledged.
    fn post_message(&self, payload: Value, target_origin: &str) -> Result<(), ChannelError>;
}

/// Provisioning of hidden embedded frames for the top-level context.
pub trait FrameHost: Send + Sync {
    /// Create a hidden frame navigated to `url`.
    fn create_hidden_frame(&self, url: &Url) -> Result<ContextId, ChannelError>;
}
