//! Requests - Immutable descriptions of reads and conditional writes.
//!
//! Requests are built with chained, non-mutating combinators and then
//! handed to an executor. Plain descriptions ([`FetchRequest`],
//! [`UpdateRequest`]) carry no executor; the wrappers
//! ([`SynchronousFetchRequest`], [`AsynchronousUpdateRequest`]) bind one.
//!
//! ## Example
//!
//! ```ignore
//! use persisted_rust::{InMemoryPersistentStore, Predicate, RequestsExt};
//!
//! let store = InMemoryPersistentStore::new();
//! let adults = store
//!     .fetch::<Person>()
//!     .such_that(Predicate::field("age").ge(21))
//!     .sorted(Person::age_key(), true)
//!     .perform()?;
//!
//! let outcome = store
//!     .create_or_update::<Person>()
//!     .such_that(Predicate::field("email").eq("ann@example.com"))
//!     .modify_entity(|p| p.age += 1)
//!     .perform()
//!     .await?;
//! ```

mod asynchronous;
mod fetch;
mod sync;
mod task;
mod update;

use crate::filter::FilterExpression;
use crate::sort::SortSpec;

pub use asynchronous::{AsynchronousUpdateRequest, Dispatcher};
pub use fetch::FetchRequest;
pub use sync::{Executor, SynchronousFetchRequest};
pub use task::{PersistentStoreUpdate, UpdateResponder, UpdateResult, UpdateTask};
pub use update::{Modifier, UpdateRequest};

/// Read-only view every request exposes to the store that runs it.
///
/// Stores apply these in a fixed order: filter, sort, offset, limit.
/// The batch size only shapes how the store pages internally.
pub trait PersistentStoreRequest {
    type Entity;

    /// `None` matches every entity.
    fn filter(&self) -> Option<&FilterExpression>;

    fn sort_spec(&self) -> &SortSpec<Self::Entity>;

    fn fetch_limit(&self) -> Option<usize>;

    fn fetch_offset(&self) -> Option<usize>;

    fn fetch_batch_size(&self) -> Option<usize>;
}
