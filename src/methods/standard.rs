//! Shared bodies of the standard `/get` and `/query` methods.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::jmap::MethodError;
use crate::model::standard::{Comparator, Filter, GetArgs, GetResponse, QueryArgs, QueryResponse};
use crate::model::{DataObject, Id};
use crate::store::Snapshot;

pub const MAX_OBJECTS_IN_GET: usize = 500;
pub const MAX_QUERY_RESULTS: usize = 500;

const SUPPORTED_COLLATIONS: &[&str] = &["i;ascii-casemap", "i;unicode-casemap"];

pub trait Sortable {
    const SORT_PROPERTIES: &'static [&'static str];

    fn compare_by(&self, other: &Self, property: &str) -> Ordering;
}

pub fn get_objects<T: DataObject + Clone>(
    snapshot: Snapshot<T>,
    arguments: GetArgs<T>,
) -> Result<GetResponse<T>, MethodError> {
    let GetArgs {
        account_id,
        ids,
        properties,
        ..
    } = arguments;
    let Snapshot { state, objects } = snapshot;

    let requested = ids.as_ref().map_or(objects.len(), Vec::len);
    if requested > MAX_OBJECTS_IN_GET {
        return Err(MethodError::RequestTooLarge {
            description: format!(
                "{requested} {} objects requested, at most {MAX_OBJECTS_IN_GET} allowed",
                T::TYPE_NAME
            ),
        });
    }

    let (list, not_found) = match ids {
        None => (objects, Vec::new()),
        Some(ids) => {
            let mut seen = BTreeSet::new();
            let mut list = Vec::new();
            let mut not_found = Vec::new();
            for id in ids {
                if !seen.insert(id.clone()) {
                    continue;
                }
                match objects.iter().find(|object| object.id() == &id) {
                    Some(object) => list.push(object.clone()),
                    None => not_found.push(id),
                }
            }
            (list, not_found)
        }
    };

    Ok(GetResponse {
        account_id,
        state,
        list,
        not_found,
        properties,
    })
}

/// Applies the filter, then orders by the comparators with `id` as the final
/// tie-breaker.
pub fn filter_and_sort<T, F>(
    objects: Vec<T>,
    filter: Option<&Filter<F>>,
    sort: Option<&[Comparator]>,
    matches: impl Fn(&F, &T) -> bool,
) -> Result<Vec<T>, MethodError>
where
    T: DataObject + Sortable,
{
    let comparators = sort.unwrap_or_default();
    for comparator in comparators {
        if !T::SORT_PROPERTIES.contains(&comparator.property.as_str()) {
            return Err(MethodError::UnsupportedSort {
                description: format!(
                    "{} cannot be sorted by {}",
                    T::TYPE_NAME,
                    comparator.property
                ),
            });
        }
        if let Some(collation) = &comparator.collation {
            if !SUPPORTED_COLLATIONS.contains(&collation.as_str()) {
                return Err(MethodError::UnsupportedSort {
                    description: format!("collation {collation} is not supported"),
                });
            }
        }
    }

    let mut matched = objects
        .into_iter()
        .filter(|object| {
            filter.map_or(true, |filter| {
                filter.matches(&|condition| matches(condition, object))
            })
        })
        .collect::<Vec<_>>();

    matched.sort_by(|left, right| {
        for comparator in comparators {
            let ordering = left.compare_by(right, &comparator.property);
            let ordering = if comparator.ascending() {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        left.id().cmp(right.id())
    });

    Ok(matched)
}

pub fn window<F>(
    ids: Vec<Id>,
    arguments: &QueryArgs<F>,
    query_state: String,
) -> Result<QueryResponse, MethodError> {
    let total = ids.len();

    let start = match &arguments.anchor {
        Some(anchor) => {
            let index = ids
                .iter()
                .position(|id| id == anchor)
                .ok_or(MethodError::AnchorNotFound)?;
            let offset = arguments.anchor_offset.unwrap_or(0);
            (index as i64).saturating_add(offset).max(0)
        }
        None => match arguments.position.unwrap_or(0) {
            position if position < 0 => (total as i64).saturating_add(position).max(0),
            position => position,
        },
    };
    let start = usize::try_from(start).unwrap_or(usize::MAX).min(total);

    let requested = arguments
        .limit
        .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX));
    let effective = requested.map_or(MAX_QUERY_RESULTS, |limit| limit.min(MAX_QUERY_RESULTS));
    let end = start.saturating_add(effective).min(total);
    let clamped = requested.map_or(true, |limit| limit > MAX_QUERY_RESULTS) && total - start > effective;

    Ok(QueryResponse {
        account_id: arguments.account_id.clone(),
        query_state,
        can_calculate_changes: false,
        position: start as u64,
        ids: ids[start..end].to_vec(),
        total: arguments
            .calculate_total
            .unwrap_or(false)
            .then_some(total as u64),
        limit: clamped.then_some(MAX_QUERY_RESULTS as u64),
    })
}
