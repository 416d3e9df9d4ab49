//! Execution context descriptor for a browsing context.

use std::{fmt, sync::Arc};

use url::Url;

use crate::traits::{ConfigError, FrameHost, ParentChannel};

/// Relation of a context to its parent, with the capabilities of that role.
#[derive(Clone)]
pub enum Role {
    /// The top-level window. Provisions frames and receives messages.
    TopLevel { frames: Arc<dyn FrameHost> },
    /// A frame embedded by a top-level window. Sends to the parent only.
    Embedded { parent: Arc<dyn ParentChannel> },
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopLevel { .. } => f.write_str("TopLevel"),
            Self::Embedded { .. } => f.write_str("Embedded"),
        }
    }
}

/// Injected description of the context a store runs in.
///
/// Stands in for the ambient window globals so both roles can be driven
/// without a real multi-frame host.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The context's own URL.
    pub location: Url,

    /// Top-level or embedded, with the matching capability.
    pub role: Role,
}

impl ExecutionContext {
    /// Create a top-level context.
    #[must_use]
    pub fn top_level(location: Url, frames: Arc<dyn FrameHost>) -> Self {
        Self {
            location,
            role: Role::TopLevel { frames },
        }
    }

    /// Create an embedded context.
    #[must_use]
    pub fn embedded(location: Url, parent: Arc<dyn ParentChannel>) -> Self {
        Self {
            location,
            role: Role::Embedded { parent },
        }
    }

    /// Whether this is the top-level context.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        matches!(self.role, Role::TopLevel { .. })
    }

    /// Serialized origin of this context, or `"null"` when opaque.
    #[must_use]
    pub fn origin(&self) -> String {
        self.location.origin().ascii_serialization()
    }
}

/// Parse an absolute URL and resolve its origin.
///
/// # Errors
/// Returns error if the URL does not parse or its origin is opaque.
pub fn resolve_origin(raw: &str) -> Result<(Url, String), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "opaque origin".to_string(),
        });
    }

    Ok((url, origin.ascii_serialization()))
}
