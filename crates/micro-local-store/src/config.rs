//! Store configuration.

use micro_local_store_core::traits::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Logical store identifier shared by every context.
    #[serde(default)]
    pub id: String,

    /// Absolute URLs whose origins take part in sync.
    ///
    /// Empty means the current context's own location.
    #[serde(default)]
    pub allowed_urls: Vec<String>,
}

impl StoreConfig {
    /// Config for store `id` limited to the current origin.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            allowed_urls: Vec::new(),
        }
    }

    /// Set the allowed URLs.
    #[must_use]
    pub fn with_allowed_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the config is invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the store identifier.
    ///
    /// URLs are checked when the store resolves them against its location.
    ///
    /// # Errors
    /// Returns error if the identifier is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingId);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StoreConfig::new("cart").with_allowed_urls(["https://a.example/"]);
        assert_eq!(config.id, "cart");
        assert_eq!(config.allowed_urls, ["https://a.example/"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(matches!(
            StoreConfig::new("").validate(),
            Err(ConfigError::MissingId)
        ));
        assert!(matches!(
            StoreConfig::new("  ").validate(),
            Err(ConfigError::MissingId)
        ));
    }

    #[test]
    fn test_from_json() {
        let config = StoreConfig::from_json(
            r#"{"id": "cart", "allowed_urls": ["https://a.example/", "https://b.example/"]}"#,
        )
        .unwrap();
        assert_eq!(config.allowed_urls.len(), 2);

        let config = StoreConfig::from_json(r#"{"id": "cart"}"#).unwrap();
        assert!(config.allowed_urls.is_empty());
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            StoreConfig::from_json(r#"{"allowed_urls": []}"#),
            Err(ConfigError::MissingId)
        ));
        assert!(matches!(
            StoreConfig::from_json("{id: cart"),
            Err(ConfigError::Parse(_))
        ));
    }
}
