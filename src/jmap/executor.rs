//! Sequential execution of one request
//!
//! Every call runs through the same pipeline: lookup, capability check,
//! reference resolution, validation, dispatch. Whatever the outcome, a
//! response is recorded in the cache before the next call starts, so later
//! calls can only ever see earlier results.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::cache::ResponseCache;
use super::envelope::{MethodCall, MethodResponse, Request, Response};
use super::errors::{MethodError, RequestError};
use super::reference::resolve;
use super::registry::MethodRegistry;

pub const DEFAULT_MAX_CALLS_IN_REQUEST: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_calls_in_request: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_calls_in_request: DEFAULT_MAX_CALLS_IN_REQUEST,
        }
    }
}

pub struct Executor<'r> {
    registry: &'r MethodRegistry,
    limits: RequestLimits,
}

impl<'r> Executor<'r> {
    pub fn new(registry: &'r MethodRegistry) -> Self {
        Self {
            registry,
            limits: RequestLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn check_request(&self, request: &Request) -> Result<(), RequestError> {
        if request.method_calls.len() > self.limits.max_calls_in_request {
            return Err(RequestError::Limit {
                limit: "maxCallsInRequest",
                detail: format!(
                    "{} method calls given, at most {} allowed",
                    request.method_calls.len(),
                    self.limits.max_calls_in_request
                ),
            });
        }

        if let Some(unknown) = request
            .using
            .iter()
            .find(|capability| !self.registry.supports_capability(capability))
        {
            return Err(RequestError::UnknownCapability(unknown.clone()));
        }

        Ok(())
    }

    pub async fn execute(&self, request: Request) -> Result<Response, RequestError> {
        self.check_request(&request)?;

        let Request {
            using,
            method_calls,
        } = request;
        let mut cache = ResponseCache::with_capacity(method_calls.len());

        for (index, call) in method_calls.into_iter().enumerate() {
            let response = self.execute_call(index, call, &using, &cache).await;
            cache.record(response);
        }

        Ok(Response {
            method_responses: cache.into_responses(),
        })
    }

    async fn execute_call(
        &self,
        index: usize,
        call: MethodCall,
        using: &[String],
        cache: &ResponseCache,
    ) -> MethodResponse {
        let MethodCall {
            name,
            arguments,
            call_id,
        } = call;

        match self.run(index, &name, arguments, using, cache).await {
            Ok(payload) => {
                info!(method = %name, call_id = %call_id, outcome = "success", "method call audited");
                MethodResponse::new(name, payload, call_id)
            }
            Err(error) => {
                info!(
                    method = %name,
                    call_id = %call_id,
                    outcome = "failure",
                    error_type = error.error_type(),
                    error = %error,
                    "method call audited"
                );
                MethodResponse::error(&error, call_id)
            }
        }
    }

    async fn run(
        &self,
        index: usize,
        name: &str,
        arguments: Map<String, Value>,
        using: &[String],
        cache: &ResponseCache,
    ) -> Result<Value, MethodError> {
        let method = self.registry.lookup(name).ok_or(MethodError::UnknownMethod)?;

        let capability = method.capability();
        if !using.iter().any(|declared| declared == capability) {
            return Err(MethodError::Forbidden {
                capability: capability.to_string(),
            });
        }

        let arguments = resolve(Value::Object(arguments), cache, index)?;
        debug!(method = %name, index, "references resolved");

        let invocation = method.validate(&arguments)?;
        debug!(method = %name, index, "arguments validated");

        // A panic inside a method becomes a serverFail for that call alone.
        match tokio::spawn(invocation.invoke()).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                warn!(method = %name, index, error = %join_error, "method dispatch aborted");
                Err(MethodError::server_fail(if join_error.is_panic() {
                    "method implementation panicked"
                } else {
                    "method dispatch was cancelled"
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{Executor, RequestLimits};
    use crate::jmap::errors::{MethodError, RequestError};
    use crate::jmap::registry::{Method, MethodRegistry, CORE_CAPABILITY};
    use crate::jmap::Request;
    use crate::methods::core::Echo;
    use crate::model::mail::{Mailbox, MAIL_CAPABILITY};
    use crate::model::standard::GetArgs;
    use crate::model::{EchoArguments, ObjectWriter, Record};

    #[derive(Clone, Default)]
    struct RecordingGet {
        calls: Arc<Mutex<Vec<Option<Vec<String>>>>>,
    }

    #[async_trait]
    impl Method for RecordingGet {
        type Arguments = GetArgs<Mailbox>;
        type Response = EchoArguments;

        const NAME: &'static str = "Mailbox/get";
        const CAPABILITY: &'static str = MAIL_CAPABILITY;

        async fn call(&self, arguments: GetArgs<Mailbox>) -> Result<EchoArguments, MethodError> {
            let ids = arguments
                .ids
                .map(|ids| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>());
            self.calls.lock().expect("lock").push(ids.clone());

            let ids = ids.unwrap_or_else(|| vec!["m1".to_string(), "m2".to_string()]);
            let payload = ObjectWriter::new()
                .field("accountId", &arguments.account_id)
                .field("ids", &ids)
                .build();
            Ok(EchoArguments::from_value(&payload).expect("mapping"))
        }
    }

    struct Explode;

    #[async_trait]
    impl Method for Explode {
        type Arguments = EchoArguments;
        type Response = EchoArguments;

        const NAME: &'static str = "Core/explode";
        const CAPABILITY: &'static str = CORE_CAPABILITY;

        async fn call(&self, arguments: EchoArguments) -> Result<EchoArguments, MethodError> {
            let empty: Vec<usize> = Vec::new();
            let _ = empty[arguments.0.len()];
            Ok(arguments)
        }
    }

    fn registry(recorder: &RecordingGet) -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry
            .register(Echo)
            .register(Explode)
            .register(recorder.clone());
        registry
    }

    fn request(using: &[&str], calls: Value) -> Request {
        Request::from_value(json!({"using": using, "methodCalls": calls})).expect("request")
    }

    async fn run(registry: &MethodRegistry, request: Request) -> Value {
        Executor::new(registry)
            .execute(request)
            .await
            .expect("executed")
            .to_value()
    }

    #[tokio::test]
    async fn echo_round_trips_its_arguments() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(&[CORE_CAPABILITY], json!([["Core/echo", {"test": 42}, "c1"]])),
        )
        .await;

        assert_eq!(
            output,
            json!({"methodResponses": [["Core/echo", {"test": 42}, "c1"]]})
        );
    }

    #[tokio::test]
    async fn back_reference_feeds_an_earlier_result() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(
                &[CORE_CAPABILITY, MAIL_CAPABILITY],
                json!([
                    ["Mailbox/get", {"accountId": "primary"}, "a"],
                    ["Mailbox/get", {
                        "accountId": "primary",
                        "#ids": {"resultOf": "a", "name": "Mailbox/get", "path": "/ids"}
                    }, "b"]
                ]),
            ),
        )
        .await;

        assert_eq!(output["methodResponses"][1][0], "Mailbox/get");
        assert_eq!(output["methodResponses"][1][1]["ids"], json!(["m1", "m2"]));
        assert_eq!(
            *recorder.calls.lock().expect("lock"),
            vec![None, Some(vec!["m1".to_string(), "m2".to_string()])]
        );
    }

    #[tokio::test]
    async fn failures_stay_in_their_own_slot() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(
                &[CORE_CAPABILITY, MAIL_CAPABILITY],
                json!([
                    ["Core/echo", {"n": 1}, "c1"],
                    ["Mailbox/get", {
                        "accountId": "primary",
                        "#ids": {"resultOf": "zzz", "name": "Mailbox/get", "path": "/ids"}
                    }, "c2"],
                    ["Foo/bar", {}, "c3"],
                    ["Mailbox/get", {"accountId": 7}, "c4"],
                    ["Core/echo", {"n": 5}, "c5"]
                ]),
            ),
        )
        .await;

        let responses = output["methodResponses"].as_array().expect("responses");
        assert_eq!(responses.len(), 5);
        assert_eq!(responses[0], json!(["Core/echo", {"n": 1}, "c1"]));
        assert_eq!(responses[1][0], "error");
        assert_eq!(responses[1][1]["type"], "invalidResultReference");
        assert_eq!(responses[1][1]["resultOf"], "zzz");
        assert_eq!(responses[2], json!(["error", {"type": "unknownMethod"}, "c3"]));
        assert_eq!(responses[3][1]["type"], "invalidArguments");
        assert_eq!(responses[3][1]["errors"][0]["path"], "/accountId");
        assert_eq!(responses[4], json!(["Core/echo", {"n": 5}, "c5"]));
        assert!(recorder.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn panicking_method_fails_only_its_own_call() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(
                &[CORE_CAPABILITY],
                json!([
                    ["Core/echo", {"n": 1}, "c1"],
                    ["Core/explode", {}, "c2"],
                    ["Core/echo", {"n": 3}, "c3"]
                ]),
            ),
        )
        .await;

        let responses = output["methodResponses"].as_array().expect("responses");
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0], json!(["Core/echo", {"n": 1}, "c1"]));
        assert_eq!(responses[1][0], "error");
        assert_eq!(responses[1][1]["type"], "serverFail");
        assert_eq!(responses[1][2], "c2");
        assert_eq!(responses[2], json!(["Core/echo", {"n": 3}, "c3"]));
    }

    #[tokio::test]
    async fn one_call_can_carry_several_references() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(
                &[CORE_CAPABILITY],
                json!([
                    ["Core/echo", {"a": [1, 2], "b": {"c": "x"}}, "c1"],
                    ["Core/echo", {
                        "#p": {"resultOf": "c1", "name": "Core/echo", "path": "/a"},
                        "deep": [{"#q": {"resultOf": "c1", "name": "Core/echo", "path": "/b/c"}}]
                    }, "c2"]
                ]),
            ),
        )
        .await;

        assert_eq!(
            output["methodResponses"][1],
            json!(["Core/echo", {"p": [1, 2], "deep": [{"q": "x"}]}, "c2"])
        );
    }

    #[tokio::test]
    async fn missing_capability_is_forbidden_without_invoking() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(
                &[CORE_CAPABILITY],
                json!([["Mailbox/get", {"accountId": "primary"}, "c1"]]),
            ),
        )
        .await;

        assert_eq!(output["methodResponses"][0][0], "error");
        assert_eq!(output["methodResponses"][0][1]["type"], "forbidden");
        assert!(recorder.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn forward_and_self_references_are_rejected() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(
                &[CORE_CAPABILITY],
                json!([
                    ["Core/echo", {"#x": {"resultOf": "c2", "name": "Core/echo", "path": "/x"}}, "c1"],
                    ["Core/echo", {"#x": {"resultOf": "c2", "name": "Core/echo", "path": "/x"}}, "c2"]
                ]),
            ),
        )
        .await;

        for response in output["methodResponses"].as_array().expect("responses") {
            assert_eq!(response[1]["type"], "invalidResultReference");
        }
    }

    #[tokio::test]
    async fn dependents_of_failed_calls_fail_too() {
        let recorder = RecordingGet::default();
        let output = run(
            &registry(&recorder),
            request(
                &[CORE_CAPABILITY],
                json!([
                    ["Foo/bar", {}, "a"],
                    ["Core/echo", {"#x": {"resultOf": "a", "name": "Foo/bar", "path": "/x"}}, "b"]
                ]),
            ),
        )
        .await;

        assert_eq!(output["methodResponses"][1][1]["type"], "invalidResultReference");
    }

    #[tokio::test]
    async fn arguments_without_references_pass_through_unchanged() {
        let recorder = RecordingGet::default();
        let arguments = json!({"deep": {"list": [{"#tag": "plain"}, [1, 2]]}, "flag": null});
        let output = run(
            &registry(&recorder),
            request(&[CORE_CAPABILITY], json!([["Core/echo", arguments.clone(), "c1"]])),
        )
        .await;

        assert_eq!(output["methodResponses"][0][1], arguments);
    }

    #[tokio::test]
    async fn request_level_checks_run_before_any_call() {
        let recorder = RecordingGet::default();
        let registry = registry(&recorder);
        let executor = Executor::new(&registry).with_limits(RequestLimits {
            max_calls_in_request: 1,
        });

        let too_many = request(
            &[CORE_CAPABILITY, MAIL_CAPABILITY],
            json!([
                ["Mailbox/get", {"accountId": "primary"}, "a"],
                ["Mailbox/get", {"accountId": "primary"}, "b"]
            ]),
        );
        assert!(matches!(
            executor.execute(too_many).await,
            Err(RequestError::Limit { limit: "maxCallsInRequest", .. })
        ));

        let unknown = request(&["urn:example:unknown"], json!([]));
        assert_eq!(
            executor.execute(unknown).await,
            Err(RequestError::UnknownCapability("urn:example:unknown".to_string()))
        );
        assert!(recorder.calls.lock().expect("lock").is_empty());
    }
}
