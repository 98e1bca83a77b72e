use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod jmap;
pub mod logging;
pub mod methods;
pub mod model;
pub mod store;

use jmap::{MethodRegistry, RequestLimits};
use model::Id;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub account_id: Id,
    pub username: String,
    pub limits: RequestLimits,
}

#[derive(Clone)]
pub struct AppState {
    pub api_token: Arc<str>,
    pub session: Arc<SessionSettings>,
    pub registry: Arc<MethodRegistry>,
}

impl AppState {
    pub fn new(api_token: String, session: SessionSettings, registry: MethodRegistry) -> Self {
        Self {
            api_token: Arc::<str>::from(api_token),
            session: Arc::new(session),
            registry: Arc::new(registry),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(http::handlers::API_URL, post(http::handlers::api_endpoint))
        .route("/.well-known/jmap", get(http::handlers::session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(http::handlers::MAX_SIZE_REQUEST))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::jmap::CORE_CAPABILITY;
    use crate::methods::build_registry;
    use crate::model::mail::MAIL_CAPABILITY;
    use crate::store::InMemoryMailStore;

    use super::*;

    const TOKEN: &str = "token-1234567890ab";

    fn app() -> Router {
        let account_id = Id::new("primary").expect("id");
        let store = Arc::new(InMemoryMailStore::with_sample_data(account_id.clone()));
        let session = SessionSettings {
            account_id,
            username: "user@localhost".to_string(),
            limits: RequestLimits {
                max_calls_in_request: 3,
            },
        };
        build_app(AppState::new(
            TOKEN.to_string(),
            session,
            build_registry(store),
        ))
    }

    fn api_request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .uri("/jmap")
            .method("POST")
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .expect("request build")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert_eq!(body, "{\"status\":\"ok\"}");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api")
                    .method("POST")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_requires_token() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/jmap")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["code"], "missing_token");
    }

    #[tokio::test]
    async fn session_advertises_capabilities_and_limits() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/jmap")
                    .method("GET")
                    .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["capabilities"][CORE_CAPABILITY]["maxCallsInRequest"], 3);
        assert_eq!(body["capabilities"][MAIL_CAPABILITY], json!({}));
        assert_eq!(body["primaryAccounts"][MAIL_CAPABILITY], "primary");
        assert_eq!(body["accounts"]["primary"]["name"], "user@localhost");
        assert_eq!(body["apiUrl"], "/jmap");
    }

    #[tokio::test]
    async fn api_rejects_wrong_token() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/jmap")
                    .method("POST")
                    .header(header::AUTHORIZATION, "Bearer wrong-token")
                    .body(Body::from("{}"))
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "invalid_token");
    }

    #[tokio::test]
    async fn api_executes_method_calls() {
        let request = json!({
            "using": [CORE_CAPABILITY, MAIL_CAPABILITY],
            "methodCalls": [
                ["Core/echo", {"test": 42}, "c1"],
                ["Mailbox/get", {"accountId": "primary", "ids": ["m1"], "properties": ["name"]}, "c2"],
                ["Foo/bar", {}, "c3"]
            ]
        });
        let response = app()
            .oneshot(api_request(request.to_string()))
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({
                "methodResponses": [
                    ["Core/echo", {"test": 42}, "c1"],
                    ["Mailbox/get", {
                        "accountId": "primary",
                        "state": "0",
                        "list": [{"id": "m1", "name": "Inbox"}],
                        "notFound": []
                    }, "c2"],
                    ["error", {"type": "unknownMethod"}, "c3"]
                ]
            })
        );
    }

    #[tokio::test]
    async fn api_reports_request_level_problems() {
        let cases = [
            ("{not json".to_string(), "urn:ietf:params:jmap:error:notJSON"),
            (
                json!({"methodCalls": []}).to_string(),
                "urn:ietf:params:jmap:error:notRequest",
            ),
            (
                json!({"using": ["urn:example:nope"], "methodCalls": []}).to_string(),
                "urn:ietf:params:jmap:error:unknownCapability",
            ),
            (
                json!({
                    "using": [CORE_CAPABILITY],
                    "methodCalls": [
                        ["Core/echo", {}, "1"],
                        ["Core/echo", {}, "2"],
                        ["Core/echo", {}, "3"],
                        ["Core/echo", {}, "4"]
                    ]
                })
                .to_string(),
                "urn:ietf:params:jmap:error:limit",
            ),
        ];

        for (body, problem_type) in cases {
            let response = app()
                .oneshot(api_request(body))
                .await
                .expect("request execution");

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                response
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok()),
                Some("application/problem+json")
            );
            let problem = body_json(response).await;
            assert_eq!(problem["type"], problem_type);
            assert_eq!(problem["status"], 400);
        }
    }
}
