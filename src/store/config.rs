//! StoreConfig - Settings for an in-memory persistent store.

use serde::Deserialize;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Shown in logs and in the writer thread's name.
    pub name: String,
    /// How many updates may wait for the writer before submission blocks.
    pub queue_capacity: usize,
    /// Decode chunk size for requests without their own batch size.
    pub default_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            queue_capacity: 64,
            default_batch_size: 256,
        }
    }
}

impl StoreConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn default_batch_size(mut self, batch_size: usize) -> Self {
        self.default_batch_size = batch_size.max(1);
        self
    }

    /// Parse a JSON document; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let config: StoreConfig = serde_json::from_str(json)?;
        let (capacity, batch_size) = (config.queue_capacity, config.default_batch_size);
        Ok(config.queue_capacity(capacity).default_batch_size(batch_size))
    }
}
