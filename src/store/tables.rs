//! Tables - Snapshot-able record storage behind the in-memory store.

use std::sync::Arc;

use im::{HashMap, OrdMap};

use crate::context::StagedWrite;
use crate::entity::{Entity, RecordId};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub(crate) struct StoredRecord {
    pub bytes: Arc<[u8]>,
    pub version: u64,
    pub unique_key: Option<String>,
}

pub(crate) type Collection = OrdMap<RecordId, StoredRecord>;

/// Every collection plus the id allocator.
///
/// Cloning is cheap (structural sharing), which is what gives readers a
/// stable snapshot and the writer a private staging copy.
#[derive(Debug, Clone)]
pub(crate) struct Tables {
    collections: HashMap<&'static str, Collection>,
    next_id: u64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            next_id: 1,
        }
    }
}

impl Tables {
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn set_next_id(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn allocate_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn contains(&self, collection: &str, id: RecordId) -> bool {
        self.collections
            .get(collection)
            .map(|c| c.contains_key(&id))
            .unwrap_or(false)
    }

    /// Serialize and store an entity, bumping its version.
    pub fn put_entity<T: Entity>(&mut self, id: RecordId, entity: &T) -> Result<u64, StoreError> {
        let bytes = serde_json::to_vec(entity)?;
        self.put_raw(T::COLLECTION, id, bytes, entity.unique_key())
    }

    pub fn put_raw(
        &mut self,
        collection: &'static str,
        id: RecordId,
        bytes: Vec<u8>,
        unique_key: Option<String>,
    ) -> Result<u64, StoreError> {
        let records = self
            .collections
            .entry(collection)
            .or_insert_with(OrdMap::new);

        if let Some(key) = &unique_key {
            let taken = records
                .iter()
                .any(|(other, record)| *other != id && record.unique_key.as_ref() == Some(key));
            if taken {
                return Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    key: key.clone(),
                });
            }
        }

        let version = records.get(&id).map(|r| r.version + 1).unwrap_or(1);
        records.insert(
            id,
            StoredRecord {
                bytes: Arc::from(bytes),
                version,
                unique_key,
            },
        );
        if id.0 >= self.next_id {
            self.next_id = id.0 + 1;
        }
        Ok(version)
    }

    pub fn remove(&mut self, collection: &str, id: RecordId) -> bool {
        match self.collections.get_mut(collection) {
            Some(records) => records.remove(&id).is_some(),
            None => false,
        }
    }

    /// Apply writes staged through a storage context, in order.
    pub fn apply(&mut self, writes: Vec<StagedWrite>) -> Result<(), StoreError> {
        for write in writes {
            match write {
                StagedWrite::Insert {
                    collection,
                    id,
                    bytes,
                    unique_key,
                } => {
                    self.put_raw(collection, id, bytes, unique_key)?;
                }
                StagedWrite::Delete { collection, id } => {
                    self.remove(collection, id);
                }
            }
        }
        Ok(())
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }
}
