//! Translation of requests into scans over stored JSON records.

use tracing::trace;

use super::tables::Collection;
use crate::entity::{Entity, RecordId};
use crate::error::StoreError;
use crate::filter::{Comparison, Predicate};
use crate::request::{FetchRequest, PersistentStoreRequest};
use crate::value::Value;

/// Run `request` over `collection`: filter, sort, offset, limit.
///
/// Records are decoded in chunks of the request's batch size (or
/// `default_batch_size`); chunking never changes the result.
pub(crate) fn execute<T: Entity>(
    collection: Option<&Collection>,
    request: &FetchRequest<T>,
    default_batch_size: usize,
) -> Result<Vec<(RecordId, T)>, StoreError> {
    let Some(collection) = collection else {
        return Ok(Vec::new());
    };

    let batch_size = request
        .fetch_batch_size()
        .filter(|size| *size > 0)
        .unwrap_or(default_batch_size)
        .max(1);

    let records: Vec<_> = collection.iter().collect();
    let mut matched = Vec::new();

    for (index, chunk) in records.chunks(batch_size).enumerate() {
        trace!(
            collection = T::COLLECTION,
            batch = index,
            size = chunk.len(),
            "decoding batch"
        );
        for (id, record) in chunk {
            let json: serde_json::Value = serde_json::from_slice(&record.bytes)?;
            let keep = match request.filter() {
                Some(filter) => filter.evaluate(&mut |p| test(T::COLLECTION, p, &json))?,
                None => true,
            };
            if keep {
                let entity: T = serde_json::from_value(json)?;
                matched.push((**id, entity));
            }
        }
    }

    request
        .sort_spec()
        .sort_by_key_fn(&mut matched, |(_, entity)| entity);

    Ok(request.apply_window(matched))
}

/// Resolve a dotted field path inside a serialized entity.
fn resolve<'a>(json: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.')
        .try_fold(json, |node, segment| node.as_object()?.get(segment))
}

/// Evaluate one predicate token against a serialized entity.
fn test(collection: &str, predicate: &Predicate, json: &serde_json::Value) -> Result<bool, StoreError> {
    let field = resolve(json, predicate.field_name()).ok_or_else(|| StoreError::MalformedFilter {
        collection: collection.to_string(),
        reason: format!("no field `{}`", predicate.field_name()),
    })?;
    let scalar = Value::from_json(field);

    let ordered = |wanted: &Value, accept: fn(std::cmp::Ordering) -> bool| {
        scalar
            .as_ref()
            .and_then(|v| v.compare(wanted))
            .map(accept)
            .unwrap_or(false)
    };

    let result = match predicate.comparison() {
        Comparison::Equal(v) => ordered(v, |o| o.is_eq()),
        Comparison::NotEqual(v) => !ordered(v, |o| o.is_eq()),
        Comparison::LessThan(v) => ordered(v, |o| o.is_lt()),
        Comparison::LessThanOrEqual(v) => ordered(v, |o| o.is_le()),
        Comparison::GreaterThan(v) => ordered(v, |o| o.is_gt()),
        Comparison::GreaterThanOrEqual(v) => ordered(v, |o| o.is_ge()),
        Comparison::Contains(needle) => match (field, needle) {
            (serde_json::Value::String(text), Value::Text(part)) => text.contains(part.as_str()),
            (serde_json::Value::Array(items), _) => items
                .iter()
                .filter_map(Value::from_json)
                .any(|item| item.compare(needle).map(|o| o.is_eq()).unwrap_or(false)),
            _ => false,
        },
        Comparison::BeginsWith(prefix) => field
            .as_str()
            .map(|text| text.starts_with(prefix.as_str()))
            .unwrap_or(false),
        Comparison::In(values) => values.iter().any(|v| ordered(v, |o| o.is_eq())),
        Comparison::IsNull => scalar.as_ref().is_some_and(Value::is_null),
        Comparison::IsNotNull => !scalar.as_ref().is_some_and(Value::is_null),
    };
    Ok(result)
}
