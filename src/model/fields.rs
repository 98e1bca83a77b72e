//! Generic field validation over `serde_json::Value`
//!
//! [`ObjectReader`] walks one mapping, collecting every field-level violation
//! instead of stopping at the first one, and [`ObjectWriter`] builds the inverse.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::model::{Id, ValidationError, ValidationErrors};

pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

pub trait FieldValue: Sized {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors>;
    fn write(&self) -> Value;
}

pub trait MapKey: Sized + Ord {
    fn parse_key(key: &str) -> Result<Self, String>;
    fn as_key(&self) -> &str;
}

pub fn child_path(parent: &str, segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    format!("{parent}/{escaped}")
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> ValidationErrors {
    ValidationErrors::single(path, format!("expected {expected}, got {}", kind_of(value)))
}

/// Unwraps a field that [`ObjectReader::required`] reported as missing.
///
/// Only reachable when a record ignores the result of `finish()`.
pub fn present<T>(value: Option<T>, path: &str) -> Result<T, ValidationErrors> {
    value.ok_or_else(|| ValidationErrors::single(path, "record is incomplete"))
}

pub struct ObjectReader<'a> {
    object: &'a Map<String, Value>,
    path: String,
    known: Vec<&'static str>,
    errors: ValidationErrors,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value, path: &str) -> Result<Self, ValidationErrors> {
        let Some(object) = value.as_object() else {
            return Err(mismatch(path, "an object", value));
        };

        Ok(Self {
            object,
            path: path.to_string(),
            known: Vec::new(),
            errors: ValidationErrors::default(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn field_path(&self, name: &str) -> String {
        child_path(&self.path, name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.object.contains_key(name)
    }

    pub fn required<T: FieldValue>(&mut self, name: &'static str) -> Option<T> {
        self.known.push(name);
        match self.object.get(name) {
            None => {
                self.invalid(name, "required field is missing");
                None
            }
            Some(Value::Null) => {
                self.invalid(name, "must not be null");
                None
            }
            Some(value) => self.read_slot(name, value),
        }
    }

    pub fn optional<T: FieldValue>(&mut self, name: &'static str) -> Option<T> {
        self.known.push(name);
        match self.object.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => self.read_slot(name, value),
        }
    }

    /// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
    pub fn nullable<T: FieldValue>(&mut self, name: &'static str) -> Option<Option<T>> {
        self.known.push(name);
        match self.object.get(name) {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => self.read_slot(name, value).map(Some),
        }
    }

    pub fn invalid(&mut self, name: &str, reason: impl Into<String>) {
        let path = self.field_path(name);
        self.errors.push(ValidationError::new(path, reason));
    }

    pub fn invalid_at(&mut self, path: String, reason: impl Into<String>) {
        self.errors.push(ValidationError::new(path, reason));
    }

    /// Fails on collected errors and on any field the record did not declare.
    pub fn finish(mut self) -> Result<(), ValidationErrors> {
        for key in self.object.keys() {
            if !self.known.contains(&key.as_str()) {
                let path = child_path(&self.path, key);
                self.errors.push(ValidationError::new(path, "unknown field"));
            }
        }
        self.finish_lenient()
    }

    pub fn finish_lenient(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn read_slot<T: FieldValue>(&mut self, name: &str, value: &Value) -> Option<T> {
        match T::read(value, &self.field_path(name)) {
            Ok(parsed) => Some(parsed),
            Err(errors) => {
                self.errors.extend(errors);
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ObjectWriter {
    object: Map<String, Value>,
}

impl ObjectWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: FieldValue>(mut self, name: &str, value: &T) -> Self {
        self.object.insert(name.to_string(), value.write());
        self
    }

    pub fn optional<T: FieldValue>(mut self, name: &str, value: &Option<T>) -> Self {
        if let Some(value) = value {
            self.object.insert(name.to_string(), value.write());
        }
        self
    }

    pub fn or_null<T: FieldValue>(mut self, name: &str, value: &Option<T>) -> Self {
        let value = value.as_ref().map(FieldValue::write).unwrap_or(Value::Null);
        self.object.insert(name.to_string(), value);
        self
    }

    pub fn nullable<T: FieldValue>(self, name: &str, value: &Option<Option<T>>) -> Self {
        match value {
            Some(inner) => self.or_null(name, inner),
            None => self,
        }
    }

    pub fn build(self) -> Value {
        Value::Object(self.object)
    }
}

impl FieldValue for String {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(path, "a string", value))
    }

    fn write(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FieldValue for bool {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        value
            .as_bool()
            .ok_or_else(|| mismatch(path, "a boolean", value))
    }

    fn write(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for i64 {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let Value::Number(number) = value else {
            return Err(mismatch(path, "an integer", value));
        };
        let Some(parsed) = number.as_i64() else {
            return Err(ValidationErrors::single(path, "expected an integer"));
        };
        if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&parsed) {
            return Err(ValidationErrors::single(
                path,
                "integer is outside the range -(2^53-1)..=2^53-1",
            ));
        }
        Ok(parsed)
    }

    fn write(&self) -> Value {
        Value::Number(Number::from(*self))
    }
}

impl FieldValue for u64 {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let parsed = i64::read(value, path)?;
        u64::try_from(parsed)
            .map_err(|_| ValidationErrors::single(path, "expected a non-negative integer"))
    }

    fn write(&self) -> Value {
        Value::Number(Number::from(*self))
    }
}

impl FieldValue for DateTime<Utc> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let raw = String::read(value, path)?;
        if !raw.ends_with('Z') {
            return Err(ValidationErrors::single(
                path,
                "dates must be RFC3339 UTC format ending with Z",
            ));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| {
                ValidationErrors::single(path, "dates must be RFC3339 UTC format ending with Z")
            })
    }

    fn write(&self) -> Value {
        Value::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl FieldValue for Id {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let raw = String::read(value, path)?;
        Id::new(raw).map_err(|reason| ValidationErrors::single(path, reason))
    }

    fn write(&self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

impl FieldValue for Value {
    fn read(value: &Value, _path: &str) -> Result<Self, ValidationErrors> {
        Ok(value.clone())
    }

    fn write(&self) -> Value {
        self.clone()
    }
}

impl FieldValue for Map<String, Value> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| mismatch(path, "an object", value))
    }

    fn write(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        match value {
            Value::Null => Ok(None),
            other => T::read(other, path).map(Some),
        }
    }

    fn write(&self) -> Value {
        self.as_ref().map(FieldValue::write).unwrap_or(Value::Null)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let Some(items) = value.as_array() else {
            return Err(mismatch(path, "an array", value));
        };

        let mut errors = ValidationErrors::default();
        let mut parsed = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match T::read(item, &child_path(path, &index.to_string())) {
                Ok(item) => parsed.push(item),
                Err(item_errors) => errors.extend(item_errors),
            }
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }

    fn write(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::write).collect())
    }
}

impl MapKey for String {
    fn parse_key(key: &str) -> Result<Self, String> {
        Ok(key.to_string())
    }

    fn as_key(&self) -> &str {
        self
    }
}

impl MapKey for Id {
    fn parse_key(key: &str) -> Result<Self, String> {
        Id::new(key)
    }

    fn as_key(&self) -> &str {
        self.as_str()
    }
}

impl<K: MapKey, T: FieldValue> FieldValue for BTreeMap<K, T> {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        let Some(object) = value.as_object() else {
            return Err(mismatch(path, "an object", value));
        };

        let mut errors = ValidationErrors::default();
        let mut parsed = BTreeMap::new();
        for (key, item) in object {
            let item_path = child_path(path, key);
            let key = match K::parse_key(key) {
                Ok(key) => key,
                Err(reason) => {
                    errors.push(ValidationError::new(item_path, format!("invalid key: {reason}")));
                    continue;
                }
            };
            match T::read(item, &item_path) {
                Ok(item) => {
                    parsed.insert(key, item);
                }
                Err(item_errors) => errors.extend(item_errors),
            }
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }

    fn write(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, item)| (key.as_key().to_string(), item.write()))
                .collect(),
        )
    }
}
