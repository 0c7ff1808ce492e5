//! SynchronousFetchRequest - A fetch bound to a blocking executor.

use std::fmt;
use std::sync::Arc;

use super::{FetchRequest, PersistentStoreRequest};
use crate::error::StoreError;
use crate::filter::FilterExpression;
use crate::sort::{FieldAccessor, SortSpec};

/// Runs a fetch against a store on the caller's thread.
pub type Executor<T> = Arc<dyn Fn(&FetchRequest<T>) -> Result<Vec<T>, StoreError> + Send + Sync>;

/// A [`FetchRequest`] paired with the executor that will run it.
///
/// `perform` blocks for as long as the store needs.
pub struct SynchronousFetchRequest<T> {
    executor: Executor<T>,
    request: FetchRequest<T>,
}

impl<T> Clone for SynchronousFetchRequest<T> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            request: self.request.clone(),
        }
    }
}

impl<T> SynchronousFetchRequest<T> {
    pub fn new(executor: Executor<T>, request: FetchRequest<T>) -> Self {
        Self { executor, request }
    }

    pub fn request(&self) -> &FetchRequest<T> {
        &self.request
    }

    fn map(self, f: impl FnOnce(FetchRequest<T>) -> FetchRequest<T>) -> Self {
        Self {
            executor: self.executor,
            request: f(self.request),
        }
    }

    pub fn such_that(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map(|r| r.such_that(predicate))
    }

    pub fn and(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map(|r| r.and(predicate))
    }

    pub fn or(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map(|r| r.or(predicate))
    }

    pub fn excluding(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map(|r| r.excluding(predicate))
    }

    pub fn sorted(self, by: FieldAccessor<T>, ascending: bool) -> Self {
        self.map(|r| r.sorted(by, ascending))
    }

    pub fn limit(self, limit: usize) -> Self {
        self.map(|r| r.limit(limit))
    }

    pub fn offset(self, offset: usize) -> Self {
        self.map(|r| r.offset(offset))
    }

    pub fn batch_size(self, batch_size: usize) -> Self {
        self.map(|r| r.batch_size(batch_size))
    }

    /// Run the fetch.
    pub fn perform(&self) -> Result<Vec<T>, StoreError> {
        (self.executor)(&self.request)
    }

    /// Run the fetch capped at one result.
    pub fn first(&self) -> Result<Option<T>, StoreError> {
        let capped = self.request.clone().limit(1);
        Ok((self.executor)(&capped)?.into_iter().next())
    }
}

impl<T> PersistentStoreRequest for SynchronousFetchRequest<T> {
    type Entity = T;

    fn filter(&self) -> Option<&FilterExpression> {
        self.request.filter()
    }

    fn sort_spec(&self) -> &SortSpec<T> {
        self.request.sort_spec()
    }

    fn fetch_limit(&self) -> Option<usize> {
        self.request.fetch_limit()
    }

    fn fetch_offset(&self) -> Option<usize> {
        self.request.fetch_offset()
    }

    fn fetch_batch_size(&self) -> Option<usize> {
        self.request.fetch_batch_size()
    }
}

/// Executors are not part of request identity.
impl<T> PartialEq for SynchronousFetchRequest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request
    }
}

impl<T> fmt::Debug for SynchronousFetchRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SynchronousFetchRequest")
            .field(&self.request)
            .finish()
    }
}
