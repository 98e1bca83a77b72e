//! Back-reference resolution
//!
//! An argument key `#name` whose value is a `{resultOf, name, path}` object is
//! replaced by `name`, bound to the value found at `path` inside an earlier
//! call's result. Resolution is a single pass: substituted values are never
//! searched for further references.

use serde_json::{json, Map, Value};
use thiserror::Error;

use super::cache::ResponseCache;
use super::errors::MethodError;
use super::pointer;
use crate::model::fields::child_path;
use crate::model::ValidationErrors;

pub const REFERENCE_PREFIX: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultReference {
    pub result_of: String,
    pub name: String,
    pub path: String,
}

impl ResultReference {
    pub fn parse(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.len() != 3 {
            return None;
        }
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            result_of: text("resultOf")?,
            name: text("name")?,
            path: text("path")?,
        })
    }

    pub fn to_value(&self) -> Value {
        json!({"resultOf": self.result_of, "name": self.name, "path": self.path})
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid result reference at {location}: {reason}")]
    InvalidResultReference {
        location: String,
        result_of: String,
        reason: String,
    },
    #[error("{location}: argument is given both literally and as a result reference")]
    Conflict { location: String },
}

impl From<ResolveError> for MethodError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::InvalidResultReference {
                location,
                result_of,
                reason,
            } => Self::InvalidResultReference {
                location,
                result_of,
                description: reason,
            },
            ResolveError::Conflict { location } => Self::InvalidArguments(ValidationErrors::single(
                location,
                "argument is given both literally and as a result reference",
            )),
        }
    }
}

/// Rewrites `arguments` with every reference replaced by its referent.
///
/// Only responses recorded before `current_index` are visible.
pub fn resolve(
    arguments: Value,
    cache: &ResponseCache,
    current_index: usize,
) -> Result<Value, ResolveError> {
    resolve_value(arguments, "", cache, current_index)
}

fn resolve_value(
    value: Value,
    location: &str,
    cache: &ResponseCache,
    current_index: usize,
) -> Result<Value, ResolveError> {
    match value {
        Value::Object(map) => resolve_object(map, location, cache, current_index).map(Value::Object),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                resolve_value(item, &child_path(location, &index.to_string()), cache, current_index)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

fn resolve_object(
    map: Map<String, Value>,
    location: &str,
    cache: &ResponseCache,
    current_index: usize,
) -> Result<Map<String, Value>, ResolveError> {
    for (key, value) in &map {
        if let Some(target) = reference_target(key, value) {
            if map.contains_key(target) {
                return Err(ResolveError::Conflict {
                    location: child_path(location, key),
                });
            }
        }
    }

    let mut resolved = Map::with_capacity(map.len());
    for (key, value) in map {
        let here = child_path(location, &key);
        let marker = reference_target(&key, &value)
            .map(str::to_string)
            .zip(ResultReference::parse(&value));

        match marker {
            Some((target, reference)) => {
                let referent = resolve_reference(&reference, &here, cache, current_index)?;
                resolved.insert(target, referent);
            }
            None => {
                let value = resolve_value(value, &here, cache, current_index)?;
                resolved.insert(key, value);
            }
        }
    }
    Ok(resolved)
}

fn reference_target<'k>(key: &'k str, value: &Value) -> Option<&'k str> {
    let target = key.strip_prefix(REFERENCE_PREFIX)?;
    if target.is_empty() || ResultReference::parse(value).is_none() {
        return None;
    }
    Some(target)
}

fn resolve_reference(
    reference: &ResultReference,
    location: &str,
    cache: &ResponseCache,
    current_index: usize,
) -> Result<Value, ResolveError> {
    let invalid = |reason: String| ResolveError::InvalidResultReference {
        location: location.to_string(),
        result_of: reference.result_of.clone(),
        reason,
    };

    let Some(response) = cache.lookup(&reference.result_of, current_index) else {
        return Err(invalid(format!(
            "no earlier call has id '{}'",
            reference.result_of
        )));
    };

    if response.is_error() {
        return Err(invalid(format!(
            "call '{}' failed and has no result",
            reference.result_of
        )));
    }

    if response.name != reference.name {
        return Err(invalid(format!(
            "call '{}' produced a {} response, not {}",
            reference.result_of, response.name, reference.name
        )));
    }

    let referent = pointer::evaluate(&response.payload, &reference.path)
        .map_err(|error| invalid(error.to_string()))?;

    if contains_reference(&referent) {
        return Err(invalid(
            "the referenced value itself contains a result reference".to_string(),
        ));
    }

    Ok(referent)
}

fn contains_reference(value: &Value) -> bool {
    match value {
        Value::Object(map) => map
            .iter()
            .any(|(key, value)| reference_target(key, value).is_some() || contains_reference(value)),
        Value::Array(items) => items.iter().any(contains_reference),
        _ => false,
    }
}
