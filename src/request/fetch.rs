//! FetchRequest - Immutable description of a read query.

use std::fmt;

use super::PersistentStoreRequest;
use crate::filter::FilterExpression;
use crate::sort::{FieldAccessor, SortSpec};

/// A read query over entities of type `T`.
///
/// Every builder method returns a new request with exactly one field
/// replaced. Bounds are not checked here: an offset past the end simply
/// yields an empty result when executed.
pub struct FetchRequest<T> {
    filter: FilterExpression,
    sort: SortSpec<T>,
    limit: Option<usize>,
    offset: Option<usize>,
    batch_size: Option<usize>,
}

impl<T> Default for FetchRequest<T> {
    fn default() -> Self {
        Self {
            filter: FilterExpression::All,
            sort: SortSpec::new(),
            limit: None,
            offset: None,
            batch_size: None,
        }
    }
}

impl<T> Clone for FetchRequest<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            offset: self.offset,
            batch_size: self.batch_size,
        }
    }
}

impl<T> FetchRequest<T> {
    /// A request matching every entity, unsorted and unbounded.
    pub fn all() -> Self {
        Self::default()
    }

    /// Replace the filter with `predicate`. Any filter built so far is lost.
    pub fn such_that(self, predicate: impl Into<FilterExpression>) -> Self {
        Self {
            filter: self.filter.such_that(predicate),
            ..self
        }
    }

    pub fn and(self, predicate: impl Into<FilterExpression>) -> Self {
        Self {
            filter: self.filter.and(predicate),
            ..self
        }
    }

    pub fn or(self, predicate: impl Into<FilterExpression>) -> Self {
        Self {
            filter: self.filter.or(predicate),
            ..self
        }
    }

    pub fn excluding(self, predicate: impl Into<FilterExpression>) -> Self {
        Self {
            filter: self.filter.excluding(predicate),
            ..self
        }
    }

    /// Append a sort key after any existing ones.
    pub fn sorted(self, by: FieldAccessor<T>, ascending: bool) -> Self {
        Self {
            sort: self.sort.then(by, ascending),
            ..self
        }
    }

    pub fn limit(self, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..self
        }
    }

    pub fn offset(self, offset: usize) -> Self {
        Self {
            offset: Some(offset),
            ..self
        }
    }

    /// Paging hint for the store. Never changes which entities come back.
    pub fn batch_size(self, batch_size: usize) -> Self {
        Self {
            batch_size: Some(batch_size),
            ..self
        }
    }

    /// Skip `offset` items then keep at most `limit`.
    pub fn apply_window<I>(&self, items: Vec<I>) -> Vec<I> {
        items
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

impl<T> PersistentStoreRequest for FetchRequest<T> {
    type Entity = T;

    fn filter(&self) -> Option<&FilterExpression> {
        if self.filter.is_all() {
            None
        } else {
            Some(&self.filter)
        }
    }

    fn sort_spec(&self) -> &SortSpec<T> {
        &self.sort
    }

    fn fetch_limit(&self) -> Option<usize> {
        self.limit
    }

    fn fetch_offset(&self) -> Option<usize> {
        self.offset
    }

    fn fetch_batch_size(&self) -> Option<usize> {
        self.batch_size
    }
}

impl<T> PartialEq for FetchRequest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.limit == other.limit
            && self.offset == other.offset
            && self.batch_size == other.batch_size
            && self.filter == other.filter
            && self.sort == other.sort
    }
}

impl<T> Eq for FetchRequest<T> {}

impl<T> fmt::Debug for FetchRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("filter", &self.filter.to_string())
            .field("sort", &self.sort.to_string())
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Predicate;
    use crate::value::Value;

    struct Person {
        age: i64,
    }

    fn age() -> FieldAccessor<Person> {
        FieldAccessor::new("age", |p: &Person| Value::from(p.age))
    }

    #[test]
    fn builders_replace_one_field() {
        let base = FetchRequest::<Person>::all().limit(5);
        let next = base.clone().offset(2);
        assert_eq!(next.fetch_limit(), Some(5));
        assert_eq!(next.fetch_offset(), Some(2));
        assert_eq!(base.fetch_offset(), None);
        assert!(next.filter().is_none());
    }

    #[test]
    fn equal_when_fields_match_regardless_of_call_order() {
        let a = FetchRequest::<Person>::all()
            .limit(10)
            .and(Predicate::field("age").ge(21))
            .offset(3)
            .sorted(age(), true);
        let b = FetchRequest::<Person>::all()
            .sorted(age(), true)
            .offset(3)
            .and(Predicate::field("age").ge(21))
            .limit(10);
        assert_eq!(a, b);
        assert_ne!(a.clone(), b.clone().batch_size(50));
        assert_ne!(a.clone(), b.clone().limit(11));
        assert_ne!(a, b.sorted(age(), false));
    }

    #[test]
    fn window_applies_offset_then_limit() {
        let request = FetchRequest::<Person>::all().offset(2).limit(2);
        assert_eq!(request.apply_window(vec![1, 2, 3, 4, 5]), vec![3, 4]);
        assert!(request.apply_window(vec![1]).is_empty());

        let zero = FetchRequest::<Person>::all().limit(0);
        assert!(zero.apply_window(vec![1, 2]).is_empty());
    }

    #[test]
    fn such_that_replaces_filter() {
        let request = FetchRequest::<Person>::all()
            .such_that(Predicate::field("age").gt(1))
            .such_that(Predicate::field("age").lt(9));
        assert_eq!(request.filter().unwrap().to_string(), "age < 9");
    }
}
