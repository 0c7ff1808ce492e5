//! UpdateRequest - Immutable description of a conditional create-or-update.

use std::fmt;
use std::sync::Arc;

use super::{FetchRequest, PersistentStoreRequest};
use crate::context::StorageContext;
use crate::filter::FilterExpression;
use crate::sort::{FieldAccessor, SortSpec};

/// Callback run against each matched (or newly created) entity.
pub type Modifier<T> = Arc<dyn Fn(&mut T, &mut StorageContext) + Send + Sync>;

/// A fetch plus what to do with its result.
///
/// | matches | should_update | should_create | outcome   |
/// |---------|---------------|---------------|-----------|
/// | yes     | true          | any           | Updated   |
/// | yes     | false         | any           | Unchanged |
/// | no      | any           | true          | Created   |
/// | no      | any           | false         | Unchanged |
///
/// The flags are fixed by whoever originates the request and cannot be
/// changed through the builder methods.
///
/// Without a modifier, matches are reported as `Updated` but are not
/// rewritten (their versions stay put); a create still stores
/// `T::default()`.
pub struct UpdateRequest<T> {
    fetch: FetchRequest<T>,
    should_update: bool,
    should_create: bool,
    modifier: Option<Modifier<T>>,
}

impl<T> Clone for UpdateRequest<T> {
    fn clone(&self) -> Self {
        Self {
            fetch: self.fetch.clone(),
            should_update: self.should_update,
            should_create: self.should_create,
            modifier: self.modifier.clone(),
        }
    }
}

impl<T> UpdateRequest<T> {
    pub fn new(fetch: FetchRequest<T>, should_update: bool, should_create: bool) -> Self {
        Self {
            fetch,
            should_update,
            should_create,
            modifier: None,
        }
    }

    /// Modify every match; never create.
    pub fn updating(fetch: FetchRequest<T>) -> Self {
        Self::new(fetch, true, false)
    }

    /// Create when nothing matches; leave matches alone.
    pub fn creating(fetch: FetchRequest<T>) -> Self {
        Self::new(fetch, false, true)
    }

    /// Modify every match, or create when nothing matches.
    pub fn creating_or_updating(fetch: FetchRequest<T>) -> Self {
        Self::new(fetch, true, true)
    }

    pub fn fetch_request(&self) -> &FetchRequest<T> {
        &self.fetch
    }

    pub fn should_update(&self) -> bool {
        self.should_update
    }

    pub fn should_create(&self) -> bool {
        self.should_create
    }

    pub fn modifier(&self) -> Option<&Modifier<T>> {
        self.modifier.as_ref()
    }

    /// Set the modifier, replacing any earlier one.
    pub fn modify<F>(self, modifier: F) -> Self
    where
        F: Fn(&mut T, &mut StorageContext) + Send + Sync + 'static,
    {
        Self {
            modifier: Some(Arc::new(modifier)),
            ..self
        }
    }

    /// Like [`modify`](Self::modify) for modifiers that never touch the
    /// storage context.
    pub fn modify_entity<F>(self, modifier: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.modify(move |entity, _| modifier(entity))
    }

    fn map_fetch(self, f: impl FnOnce(FetchRequest<T>) -> FetchRequest<T>) -> Self {
        Self {
            fetch: f(self.fetch),
            ..self
        }
    }

    pub fn such_that(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map_fetch(|fetch| fetch.such_that(predicate))
    }

    pub fn and(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map_fetch(|fetch| fetch.and(predicate))
    }

    pub fn or(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map_fetch(|fetch| fetch.or(predicate))
    }

    pub fn excluding(self, predicate: impl Into<FilterExpression>) -> Self {
        self.map_fetch(|fetch| fetch.excluding(predicate))
    }

    pub fn sorted(self, by: FieldAccessor<T>, ascending: bool) -> Self {
        self.map_fetch(|fetch| fetch.sorted(by, ascending))
    }

    pub fn limit(self, limit: usize) -> Self {
        self.map_fetch(|fetch| fetch.limit(limit))
    }

    pub fn offset(self, offset: usize) -> Self {
        self.map_fetch(|fetch| fetch.offset(offset))
    }

    pub fn batch_size(self, batch_size: usize) -> Self {
        self.map_fetch(|fetch| fetch.batch_size(batch_size))
    }
}

impl<T> PersistentStoreRequest for UpdateRequest<T> {
    type Entity = T;

    fn filter(&self) -> Option<&FilterExpression> {
        self.fetch.filter()
    }

    fn sort_spec(&self) -> &SortSpec<T> {
        self.fetch.sort_spec()
    }

    fn fetch_limit(&self) -> Option<usize> {
        self.fetch.fetch_limit()
    }

    fn fetch_offset(&self) -> Option<usize> {
        self.fetch.fetch_offset()
    }

    fn fetch_batch_size(&self) -> Option<usize> {
        self.fetch.fetch_batch_size()
    }
}

/// Modifiers are not part of request identity.
impl<T> PartialEq for UpdateRequest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.should_update == other.should_update
            && self.should_create == other.should_create
            && self.fetch == other.fetch
    }
}

impl<T> fmt::Debug for UpdateRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRequest")
            .field("fetch", &self.fetch)
            .field("should_update", &self.should_update)
            .field("should_create", &self.should_create)
            .field("has_modifier", &self.modifier.is_some())
            .finish()
    }
}
