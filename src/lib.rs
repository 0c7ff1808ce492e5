mod context;
mod entity;
mod error;
mod filter;
mod request;
mod sort;
mod store;
mod value;

pub use context::{StagedWrite, StorageContext};
pub use entity::{Entity, RecordId, Versioned};
pub use error::StoreError;
pub use filter::{Comparison, FieldRef, FilterExpression, Predicate};
pub use request::{
    AsynchronousUpdateRequest, Dispatcher, Executor, FetchRequest, Modifier,
    PersistentStoreRequest, PersistentStoreUpdate, SynchronousFetchRequest, UpdateRequest,
    UpdateResponder, UpdateResult, UpdateTask,
};
pub use sort::{FieldAccessor, SortDirection, SortKey, SortSpec};
pub use store::{InMemoryPersistentStore, PersistentStore, RequestsExt, StoreConfig, WriterStats};
pub use value::Value;

// Re-export the derive macro so `#[derive(Entity)]` works with a single import
#[cfg(feature = "derive")]
pub use persisted_rust_macros::Entity;
