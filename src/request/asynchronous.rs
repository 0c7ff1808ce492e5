//! AsynchronousUpdateRequest - An update bound to the store that applies it.

use std::fmt;
use std::sync::Arc;

use super::{PersistentStoreRequest, UpdateRequest, UpdateTask};
use crate::context::StorageContext;
use crate::filter::FilterExpression;
use crate::sort::{FieldAccessor, SortSpec};

/// Hands an update to the store's write path and returns its task.
pub type Dispatcher<T> = Arc<dyn Fn(UpdateRequest<T>) -> UpdateTask + Send + Sync>;

/// An [`UpdateRequest`] paired with the dispatcher that will submit it.
pub struct AsynchronousUpdateRequest<T> {
    dispatcher: Dispatcher<T>,
    request: UpdateRequest<T>,
}

impl<T> Clone for AsynchronousUpdateRequest<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            request: self.request.clone(),
        }
    }
}

impl<T> AsynchronousUpdateRequest<T> {
    pub fn new(dispatcher: Dispatcher<T>, request: UpdateRequest<T>) -> Self {
        Self {
            dispatcher,
            request,
        }
    }

    pub fn request(&self) -> &UpdateRequest<T> {
        &self.request
    }

    pub fn should_update(&self) -> bool {
        self.request.should_update()
    }

    pub fn should_create(&self) -> bool {
        self.request.should_create()
    }

    fn map(self, f: impl FnOnce(UpdateRequest<T>) -> UpdateRequest<T>) -> Self {
        Self {
            dispatcher: self.dispatcher,
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

    pub fn modify<F>(self, modifier: F) -> Self
    where
        F: Fn(&mut T, &mut StorageContext) + Send + Sync + 'static,
    {
        self.map(|r| r.modify(modifier))
    }

    pub fn modify_entity<F>(self, modifier: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.map(|r| r.modify_entity(modifier))
    }

    /// Submit the update. The returned task resolves exactly once.
    pub fn perform(self) -> UpdateTask {
        (self.dispatcher)(self.request)
    }
}

impl<T> PersistentStoreRequest for AsynchronousUpdateRequest<T> {
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

impl<T> PartialEq for AsynchronousUpdateRequest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request
    }
}

impl<T> fmt::Debug for AsynchronousUpdateRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsynchronousUpdateRequest")
            .field(&self.request)
            .finish()
    }
}
