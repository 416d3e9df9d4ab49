//! Store errors.

use micro_local_store_core::traits::{ChannelError, ConfigError, StorageError};

/// Store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}
