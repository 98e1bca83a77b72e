//! Axum HTTP handlers for the web server
//!
//! The API endpoint only parses the envelope and hands it to the
//! [`Executor`]; all per-call failures travel inside a 200 response.

use std::collections::BTreeMap;

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::jmap::{Executor, Request, Response, CORE_CAPABILITY};
use crate::methods::standard::MAX_OBJECTS_IN_GET;
use crate::AppState;

pub const API_URL: &str = "/jmap";
pub const MAX_SIZE_REQUEST: usize = 10_000_000;

const COLLATION_ALGORITHMS: &[&str] = &["i;ascii-casemap", "i;unicode-casemap"];

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub name: String,
    pub is_personal: bool,
    pub is_read_only: bool,
    pub account_capabilities: BTreeMap<&'static str, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub capabilities: BTreeMap<&'static str, Value>,
    pub accounts: BTreeMap<String, AccountInfo>,
    pub primary_accounts: BTreeMap<&'static str, String>,
    pub username: String,
    pub api_url: &'static str,
    pub state: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn session(State(state): State<AppState>) -> Json<SessionResponse> {
    let settings = &state.session;

    let capabilities = state
        .registry
        .capabilities()
        .map(|capability| {
            let limits = if capability == CORE_CAPABILITY {
                json!({
                    "maxSizeRequest": MAX_SIZE_REQUEST,
                    "maxCallsInRequest": settings.limits.max_calls_in_request,
                    "maxObjectsInGet": MAX_OBJECTS_IN_GET,
                    "collationAlgorithms": COLLATION_ALGORITHMS,
                })
            } else {
                json!({})
            };
            (capability, limits)
        })
        .collect::<BTreeMap<_, _>>();

    let account_capabilities = capabilities
        .keys()
        .filter(|capability| **capability != CORE_CAPABILITY)
        .map(|capability| (*capability, json!({})))
        .collect::<BTreeMap<_, _>>();
    let primary_accounts = account_capabilities
        .keys()
        .map(|capability| (*capability, settings.account_id.to_string()))
        .collect();

    let account = AccountInfo {
        name: settings.username.clone(),
        is_personal: true,
        is_read_only: false,
        account_capabilities,
    };

    Json(SessionResponse {
        capabilities,
        accounts: BTreeMap::from([(settings.account_id.to_string(), account)]),
        primary_accounts,
        username: settings.username.clone(),
        api_url: API_URL,
        state: "0".to_string(),
    })
}

pub async fn api_endpoint(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Response>, AppError> {
    let request = Request::from_slice(&body)?;
    let executor = Executor::new(&state.registry).with_limits(state.session.limits);
    let response = executor.execute(request).await?;
    Ok(Json(response))
}
