//! Protocol error kinds
//!
//! [`MethodError`] is isolated to one call's response slot; [`RequestError`]
//! rejects the whole request before any call runs.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::model::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MethodError {
    #[error("unknown method")]
    UnknownMethod,
    #[error("capability {capability} is not enabled for this request")]
    Forbidden { capability: String },
    #[error("invalid arguments: {0}")]
    InvalidArguments(ValidationErrors),
    #[error("invalid result reference at {location}: {description}")]
    InvalidResultReference {
        location: String,
        result_of: String,
        description: String,
    },
    #[error("account not found")]
    AccountNotFound,
    #[error("state mismatch: {description}")]
    StateMismatch { description: String },
    #[error("cannot calculate changes: {description}")]
    CannotCalculateChanges { description: String },
    #[error("unsupported sort: {description}")]
    UnsupportedSort { description: String },
    #[error("anchor not found")]
    AnchorNotFound,
    #[error("request too large: {description}")]
    RequestTooLarge { description: String },
    #[error("server failure: {description}")]
    ServerFail { description: String },
}

impl MethodError {
    pub fn server_fail(description: impl Into<String>) -> Self {
        Self::ServerFail {
            description: description.into(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownMethod => "unknownMethod",
            Self::Forbidden { .. } => "forbidden",
            Self::InvalidArguments(_) => "invalidArguments",
            Self::InvalidResultReference { .. } => "invalidResultReference",
            Self::AccountNotFound => "accountNotFound",
            Self::StateMismatch { .. } => "stateMismatch",
            Self::CannotCalculateChanges { .. } => "cannotCalculateChanges",
            Self::UnsupportedSort { .. } => "unsupportedSort",
            Self::AnchorNotFound => "anchorNotFound",
            Self::RequestTooLarge { .. } => "requestTooLarge",
            Self::ServerFail { .. } => "serverFail",
        }
    }

    pub fn to_value(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("type".to_string(), json!(self.error_type()));

        match self {
            Self::UnknownMethod | Self::AccountNotFound | Self::AnchorNotFound => {}
            Self::Forbidden { .. } => {
                payload.insert("description".to_string(), json!(self.to_string()));
            }
            Self::InvalidArguments(errors) => {
                payload.insert("description".to_string(), json!(errors.to_string()));
                let details = errors
                    .iter()
                    .map(|error| json!({"path": error.path, "reason": error.reason}))
                    .collect::<Vec<_>>();
                payload.insert("errors".to_string(), Value::Array(details));
            }
            Self::InvalidResultReference {
                location,
                result_of,
                description,
            } => {
                payload.insert("description".to_string(), json!(description));
                payload.insert("reference".to_string(), json!(location));
                payload.insert("resultOf".to_string(), json!(result_of));
            }
            Self::StateMismatch { description }
            | Self::CannotCalculateChanges { description }
            | Self::UnsupportedSort { description }
            | Self::RequestTooLarge { description }
            | Self::ServerFail { description } => {
                payload.insert("description".to_string(), json!(description));
            }
        }

        Value::Object(payload)
    }
}

impl From<ValidationErrors> for MethodError {
    fn from(errors: ValidationErrors) -> Self {
        Self::InvalidArguments(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("the request body is not valid JSON")]
    NotJson,
    #[error("the request does not match the Request structure: {0}")]
    NotRequest(String),
    #[error("the request uses an unsupported capability: {0}")]
    UnknownCapability(String),
    #[error("the request exceeds the server limit {limit}: {detail}")]
    Limit { limit: &'static str, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: &'static str,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<&'static str>,
}

impl RequestError {
    pub fn type_uri(&self) -> &'static str {
        match self {
            Self::NotJson => "urn:ietf:params:jmap:error:notJSON",
            Self::NotRequest(_) => "urn:ietf:params:jmap:error:notRequest",
            Self::UnknownCapability(_) => "urn:ietf:params:jmap:error:unknownCapability",
            Self::Limit { .. } => "urn:ietf:params:jmap:error:limit",
        }
    }

    pub fn problem(&self) -> ProblemDetails {
        ProblemDetails {
            problem_type: self.type_uri(),
            status: 400,
            detail: self.to_string(),
            limit: match self {
                Self::Limit { limit, .. } => Some(limit),
                _ => None,
            },
        }
    }
}
