//! Key-value state shared across tabs and cross-origin frames.
//!
//! Provides:
//! - `Store` - Per-context state container with listeners and role wiring
//! - `StoreConfig` - Store identifier and allowed URLs
//! - Storage implementations (memory)

pub mod config;
pub mod error;
pub mod storage;
pub mod store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use micro_local_store_core::{ExecutionContext, HostEvent, Role, State};
pub use store::{Listener, Store};
