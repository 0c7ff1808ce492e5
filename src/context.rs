//! StorageContext - Mutation handle handed to update modifiers.
//!
//! The context does not touch storage itself. It records the writes a
//! modifier asks for; the storage collaborator applies them inside the
//! same write, after the modifier returns.

use crate::entity::{Entity, RecordId};
use crate::error::StoreError;

/// A write staged by a modifier through its [`StorageContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum StagedWrite {
    Insert {
        collection: &'static str,
        id: RecordId,
        bytes: Vec<u8>,
        unique_key: Option<String>,
    },
    Delete {
        collection: &'static str,
        id: RecordId,
    },
}

/// Handle scoped to one update operation.
///
/// A failed operation poisons the context: the collaborator then aborts
/// the whole update with that error, whether or not the modifier looked
/// at the returned `Result`.
#[derive(Debug)]
pub struct StorageContext {
    collection: &'static str,
    current: RecordId,
    next_id: u64,
    writes: Vec<StagedWrite>,
    failure: Option<StoreError>,
}

impl StorageContext {
    /// Create a context for entities of `collection`, allocating new
    /// record ids from `next_id` upwards.
    pub fn new(collection: &'static str, current: RecordId, next_id: u64) -> Self {
        Self {
            collection,
            current,
            next_id,
            writes: Vec::new(),
            failure: None,
        }
    }

    /// Id of the entity the modifier is currently working on.
    pub fn record_id(&self) -> RecordId {
        self.current
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// Stage a new record of any entity type.
    pub fn insert<E: Entity>(&mut self, entity: &E) -> Result<RecordId, StoreError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let bytes = match serde_json::to_vec(entity) {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.poison(e.into())),
        };
        let id = RecordId(self.next_id);
        self.next_id += 1;
        self.writes.push(StagedWrite::Insert {
            collection: E::COLLECTION,
            id,
            bytes,
            unique_key: entity.unique_key(),
        });
        Ok(id)
    }

    /// Stage deletion of a record of type `E`.
    pub fn delete<E: Entity>(&mut self, id: RecordId) -> Result<(), StoreError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.writes.push(StagedWrite::Delete {
            collection: E::COLLECTION,
            id,
        });
        Ok(())
    }

    /// Delete the entity being modified. It will not be written back.
    pub fn delete_current(&mut self) {
        self.writes.push(StagedWrite::Delete {
            collection: self.collection,
            id: self.current,
        });
    }

    pub fn is_poisoned(&self) -> bool {
        self.failure.is_some()
    }

    fn poison(&mut self, error: StoreError) -> StoreError {
        if self.failure.is_none() {
            self.failure = Some(error.clone());
        }
        error
    }

    // Collaborator side

    /// Point the context at the next entity.
    pub fn set_current(&mut self, id: RecordId) {
        self.current = id;
    }

    /// Next unallocated record id.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Take the writes staged so far, or the error that poisoned the context.
    pub fn take_writes(&mut self) -> Result<Vec<StagedWrite>, StoreError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(std::mem::take(&mut self.writes))
    }
}
