//! Typed data model for method arguments and results
//!
//! Records are validated out of the neutral `serde_json::Value` tree through
//! [`FieldValue`] and serialize back to the same shape.

pub mod fields;
pub mod mail;
pub mod standard;

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use fields::{FieldValue, MapKey, ObjectReader, ObjectWriter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self(vec![ValidationError::new(path, reason)])
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub trait Record: FieldValue {
    fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        Self::read(value, "")
    }

    fn to_value(&self) -> Value {
        self.write()
    }
}

pub trait DataObject: FieldValue {
    const TYPE_NAME: &'static str;
    const PROPERTIES: &'static [&'static str];

    fn id(&self) -> &Id;

    fn accepts_property(property: &str) -> bool {
        Self::PROPERTIES.contains(&property)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(String);

impl Id {
    pub const MAX_LEN: usize = 255;

    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() || value.len() > Self::MAX_LEN {
            return Err("id must be between 1 and 255 characters".to_string());
        }

        if !value
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '-' || character == '_')
        {
            return Err(
                "id must contain only alphanumeric characters, dashes, and underscores".to_string(),
            );
        }

        Ok(Self(value))
    }

    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoArguments(pub Map<String, Value>);

impl FieldValue for EchoArguments {
    fn read(value: &Value, path: &str) -> Result<Self, ValidationErrors> {
        Map::<String, Value>::read(value, path).map(Self)
    }

    fn write(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl Record for EchoArguments {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{EchoArguments, Id, Record, ValidationError, ValidationErrors};

    #[test]
    fn ids_follow_the_url_safe_alphabet() {
        assert!(Id::new("Mailbox_1-a").is_ok());
        assert!(Id::new("").is_err());
        assert!(Id::new("has space").is_err());
        assert!(Id::new("a".repeat(256)).is_err());
        assert!(Id::new("a".repeat(255)).is_ok());
    }

    #[test]
    fn validation_errors_display_every_path() {
        let mut errors = ValidationErrors::single("/accountId", "required field is missing");
        errors.push(ValidationError::new("/ids/0", "expected a string, got a number"));
        assert_eq!(
            errors.to_string(),
            "/accountId: required field is missing; /ids/0: expected a string, got a number"
        );
    }

    #[test]
    fn echo_round_trips_any_mapping() {
        let value = json!({"test": 42, "nested": {"z": [1, null], "a": "b"}});
        let record = EchoArguments::from_value(&value).expect("mapping");
        assert_eq!(record.to_value(), value);
        assert!(EchoArguments::from_value(&json!([1, 2])).is_err());
    }
}
