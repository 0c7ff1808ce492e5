//! Stores - The collaborators that actually run requests.
//!
//! [`PersistentStore`] is the seam between the request layer and a storage
//! engine. [`RequestsExt`] originates requests bound to a store, choosing
//! the update flags for each kind of write.
//!
//! ## Example
//!
//! ```ignore
//! use persisted_rust::{InMemoryPersistentStore, Predicate, RequestsExt};
//!
//! let store = InMemoryPersistentStore::new();
//!
//! // create-only: runs the modifier on a fresh entity when nothing matches
//! store
//!     .create::<Person>()
//!     .such_that(Predicate::field("email").eq("ann@example.com"))
//!     .modify_entity(|p| p.email = "ann@example.com".into())
//!     .perform()
//!     .wait()?;
//! ```

mod config;
mod in_memory;
mod tables;
mod translate;
mod writer;

use std::sync::Arc;

use crate::entity::Entity;
use crate::error::StoreError;
use crate::request::{
    AsynchronousUpdateRequest, FetchRequest, SynchronousFetchRequest, UpdateRequest, UpdateTask,
};

pub use config::StoreConfig;
pub use in_memory::InMemoryPersistentStore;
pub use writer::WriterStats;

/// A storage engine able to run requests.
pub trait PersistentStore: Send + Sync {
    /// Run a fetch: filter, sort, offset, limit.
    fn fetch_entities<T: Entity>(&self, request: &FetchRequest<T>) -> Result<Vec<T>, StoreError>;

    /// Queue an update on the store's serialized write path.
    fn submit_update<T: Entity>(&self, request: UpdateRequest<T>) -> UpdateTask;

    /// Number of entities a fetch would return.
    fn count<T: Entity>(&self, request: &FetchRequest<T>) -> Result<usize, StoreError> {
        Ok(self.fetch_entities(request)?.len())
    }
}

/// Extension trait for originating requests on any cloneable store.
pub trait RequestsExt: PersistentStore + Clone + 'static {
    /// A fetch of every `T`, ready to be narrowed and performed.
    fn fetch<T: Entity>(&self) -> SynchronousFetchRequest<T> {
        let store = self.clone();
        SynchronousFetchRequest::new(
            Arc::new(move |request: &FetchRequest<T>| store.fetch_entities(request)),
            FetchRequest::all(),
        )
    }

    /// Modify every match; never create.
    fn update<T: Entity>(&self) -> AsynchronousUpdateRequest<T> {
        self.updating(UpdateRequest::updating(FetchRequest::all()))
    }

    /// Create one entity when nothing matches; leave matches untouched.
    fn create<T: Entity>(&self) -> AsynchronousUpdateRequest<T> {
        self.updating(UpdateRequest::creating(FetchRequest::all()))
    }

    /// Modify every match, or create one entity when nothing matches.
    fn create_or_update<T: Entity>(&self) -> AsynchronousUpdateRequest<T> {
        self.updating(UpdateRequest::creating_or_updating(FetchRequest::all()))
    }

    /// Bind an already built update request to this store.
    fn updating<T: Entity>(&self, request: UpdateRequest<T>) -> AsynchronousUpdateRequest<T> {
        let store = self.clone();
        AsynchronousUpdateRequest::new(
            Arc::new(move |request: UpdateRequest<T>| store.submit_update(request)),
            request,
        )
    }
}

impl<S: PersistentStore + Clone + 'static> RequestsExt for S {}
