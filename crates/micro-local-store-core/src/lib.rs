//! Core abstractions for cross-context key-value state sync.
//!
//! This crate provides the fundamental building blocks:
//! - `State` - Shallow-merged JSON snapshot and its persistence key
//! - `ExecutionContext` - Injected descriptor of the current browsing context
//! - `HostEvent` - Inbound host notifications (messages, focus, storage)
//! - `ChangeFeed` - Broadcast of snapshots for async consumers
//! - Storage, channel and frame traits

pub mod change_feed;
pub mod context;
pub mod events;
pub mod state;
pub mod traits;

pub use change_feed::ChangeFeed;
pub use context::{ExecutionContext, Role};
pub use events::HostEvent;
pub use state::State;
pub use traits::{FrameHost, ParentChannel, PersistentStorage};
