//! Entities - Types the persistent store manages.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Trait for types that can be persisted and queried.
///
/// `Default` is the blank entity a create-style update starts from before
/// its modifier fills it in.
pub trait Entity: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {
    /// The collection this type lives in (e.g., "people", "sessions").
    const COLLECTION: &'static str;

    /// Key that must be unique within the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// Store-assigned identifier of one persisted record.
///
/// Ids grow with creation order, so ordering by id is store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An entity together with its record id and version.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub id: RecordId,
    pub data: T,
    pub version: u64,
}
