//! Sorting - Field accessors and multi-key sort specifications.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::value::Value;

/// A typed reference to one field of `T`, used as a sort key.
///
/// Two accessors are equal when their tags are equal; the extractor is
/// never inspected.
pub struct FieldAccessor<T> {
    tag: String,
    extract: Arc<dyn Fn(&T) -> Value + Send + Sync>,
}

impl<T> FieldAccessor<T> {
    pub fn new<F>(tag: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self {
            tag: tag.into(),
            extract: Arc::new(extract),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self, entity: &T) -> Value {
        (self.extract)(entity)
    }
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            extract: Arc::clone(&self.extract),
        }
    }
}

impl<T> fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldAccessor").field(&self.tag).finish()
    }
}

impl<T> PartialEq for FieldAccessor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl<T> Eq for FieldAccessor<T> {}

impl<T> Hash for FieldAccessor<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }
}

/// One entry of a [`SortSpec`].
pub struct SortKey<T> {
    pub accessor: FieldAccessor<T>,
    pub direction: SortDirection,
}

impl<T> fmt::Debug for SortKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortKey")
            .field("accessor", &self.accessor)
            .field("direction", &self.direction)
            .finish()
    }
}

impl<T> PartialEq for SortKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.accessor == other.accessor && self.direction == other.direction
    }
}

impl<T> Eq for SortKey<T> {}

impl<T> Hash for SortKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.accessor.hash(state);
        self.direction.hash(state);
    }
}

impl<T> Clone for SortKey<T> {
    fn clone(&self) -> Self {
        Self {
            accessor: self.accessor.clone(),
            direction: self.direction,
        }
    }
}

/// Ordered sort keys. The first key is primary; each later key only
/// breaks ties left by the keys before it.
pub struct SortSpec<T> {
    keys: Vec<SortKey<T>>,
}

impl<T> fmt::Debug for SortSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys.iter()).finish()
    }
}

impl<T> PartialEq for SortSpec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl<T> Eq for SortSpec<T> {}

impl<T> Hash for SortSpec<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keys.hash(state);
    }
}

impl<T> Default for SortSpec<T> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<T> Clone for SortSpec<T> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
        }
    }
}

impl<T> SortSpec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key after the existing ones.
    pub fn then(mut self, accessor: FieldAccessor<T>, ascending: bool) -> Self {
        self.keys.push(SortKey {
            accessor,
            direction: SortDirection::from_ascending(ascending),
        });
        self
    }

    pub fn keys(&self) -> &[SortKey<T>] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for key in &self.keys {
            let ordering = key.accessor.value(a).sort_cmp(&key.accessor.value(b));
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `items` by the entity returned from `entity`.
    /// Items tied on every key keep their incoming order.
    pub fn sort_by_key_fn<I, F>(&self, items: &mut [I], entity: F)
    where
        F: Fn(&I) -> &T,
    {
        if self.keys.is_empty() {
            return;
        }
        items.sort_by(|a, b| self.compare(entity(a), entity(b)));
    }
}

impl<T> fmt::Display for SortSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let dir = match key.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            write!(f, "{} {}", key.accessor.tag(), dir)?;
        }
        Ok(())
    }
}
