//! Cross-context transport for micro-local-store.
//!
//! Provides:
//! - Wire protocol for state sync messages
//! - Transport bridge (frame provisioning, origin filtering, parent forwarding)
//! - In-process loopback host (feature: loopback)

pub mod bridge;
pub mod protocol;

#[cfg(feature = "loopback")]
pub mod loopback;

pub use bridge::{AllowedOrigins, FrameHandle, TransportBridge};
pub use protocol::SyncMessage;
