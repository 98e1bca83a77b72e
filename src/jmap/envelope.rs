//! Request and response envelopes
//!
//! A method call travels as the triple `[name, arguments, callId]`; responses
//! reuse the same shape with the payload in the middle.

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::errors::{MethodError, RequestError};

pub const ERROR_RESPONSE_NAME: &str = "error";

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub call_id: String,
}

impl MethodCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>, call_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: call_id.into(),
        }
    }

    fn parse(index: usize, value: Value) -> Result<Self, RequestError> {
        let shape_error =
            || RequestError::NotRequest(format!("methodCalls[{index}] must be [name, arguments, callId]"));

        let Value::Array(items) = value else {
            return Err(shape_error());
        };
        let Ok([name, arguments, call_id]) = <[Value; 3]>::try_from(items) else {
            return Err(shape_error());
        };

        match (name, arguments, call_id) {
            (Value::String(name), Value::Object(arguments), Value::String(call_id)) => Ok(Self {
                name,
                arguments,
                call_id,
            }),
            _ => Err(shape_error()),
        }
    }

    pub fn to_value(&self) -> Value {
        json!([self.name, self.arguments, self.call_id])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub using: Vec<String>,
    pub method_calls: Vec<MethodCall>,
}

impl Request {
    pub fn new(using: Vec<String>, method_calls: Vec<MethodCall>) -> Self {
        Self { using, method_calls }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::NotJson)?;
        Self::from_value(value)
    }

    /// Unknown top-level members such as `createdIds` are ignored.
    pub fn from_value(value: Value) -> Result<Self, RequestError> {
        let Value::Object(mut object) = value else {
            return Err(RequestError::NotRequest(
                "the request must be a JSON object".to_string(),
            ));
        };

        let using = match object.remove("using") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::String(capability) => Ok(capability),
                    _ => Err(RequestError::NotRequest(format!(
                        "using[{index}] must be a string"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(RequestError::NotRequest(
                    "'using' must be an array of capability URIs".to_string(),
                ))
            }
            None => return Err(RequestError::NotRequest("'using' is required".to_string())),
        };

        let method_calls = match object.remove("methodCalls") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| MethodCall::parse(index, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(RequestError::NotRequest(
                    "'methodCalls' must be an array".to_string(),
                ))
            }
            None => {
                return Err(RequestError::NotRequest(
                    "'methodCalls' is required".to_string(),
                ))
            }
        };

        Ok(Self { using, method_calls })
    }

    pub fn to_value(&self) -> Value {
        let calls = self.method_calls.iter().map(MethodCall::to_value).collect::<Vec<_>>();
        json!({"using": self.using, "methodCalls": calls})
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodResponse {
    pub name: String,
    pub payload: Value,
    pub call_id: String,
}

impl MethodResponse {
    pub fn new(name: impl Into<String>, payload: Value, call_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload,
            call_id: call_id.into(),
        }
    }

    pub fn error(error: &MethodError, call_id: impl Into<String>) -> Self {
        Self::new(ERROR_RESPONSE_NAME, error.to_value(), call_id)
    }

    pub fn is_error(&self) -> bool {
        self.name == ERROR_RESPONSE_NAME
    }
}

impl Serialize for MethodResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut triple = serializer.serialize_tuple(3)?;
        triple.serialize_element(&self.name)?;
        triple.serialize_element(&self.payload)?;
        triple.serialize_element(&self.call_id)?;
        triple.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub method_responses: Vec<MethodResponse>,
}

impl Response {
    pub fn to_value(&self) -> Value {
        let responses = self
            .method_responses
            .iter()
            .map(|response| json!([response.name, response.payload, response.call_id]))
            .collect::<Vec<_>>();
        json!({"methodResponses": responses})
    }

    pub fn find(&self, call_id: &str) -> Option<&MethodResponse> {
        self.method_responses
            .iter()
            .find(|response| response.call_id == call_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MethodResponse, Request, Response};
    use crate::jmap::errors::{MethodError, RequestError};

    #[test]
    fn parses_the_request_envelope() {
        let request = Request::from_value(json!({
            "using": ["urn:ietf:params:jmap:core"],
            "methodCalls": [["Core/echo", {"hello": true}, "c1"]],
            "createdIds": {}
        }))
        .expect("request");

        assert_eq!(request.using, vec!["urn:ietf:params:jmap:core".to_string()]);
        assert_eq!(request.method_calls.len(), 1);
        assert_eq!(request.method_calls[0].name, "Core/echo");
        assert_eq!(request.method_calls[0].call_id, "c1");
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert_eq!(Request::from_slice(b"{not json"), Err(RequestError::NotJson));

        for body in [
            json!([]),
            json!({"methodCalls": []}),
            json!({"using": "urn:ietf:params:jmap:core", "methodCalls": []}),
            json!({"using": [1], "methodCalls": []}),
            json!({"using": [], "methodCalls": [["Core/echo", {}]]}),
            json!({"using": [], "methodCalls": [["Core/echo", [], "c1"]]}),
            json!({"using": [], "methodCalls": [[1, {}, "c1"]]}),
        ] {
            assert!(
                matches!(Request::from_value(body.clone()), Err(RequestError::NotRequest(_))),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn serializes_responses_as_triples() {
        let response = Response {
            method_responses: vec![
                MethodResponse::new("Core/echo", json!({"hello": true}), "c1"),
                MethodResponse::error(&MethodError::UnknownMethod, "c2"),
            ],
        };

        let expected = json!({
            "methodResponses": [
                ["Core/echo", {"hello": true}, "c1"],
                ["error", {"type": "unknownMethod"}, "c2"]
            ]
        });
        assert_eq!(serde_json::to_value(&response).expect("serialize"), expected);
        assert_eq!(response.to_value(), expected);
        assert!(response.find("c2").expect("c2").is_error());
    }
}
