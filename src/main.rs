use std::sync::Arc;

use jmap_executor::{
    build_app, config::Config, jmap::RequestLimits, logging, methods::build_registry,
    store::InMemoryMailStore, AppState, SessionSettings,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let store = Arc::new(InMemoryMailStore::with_sample_data(config.account_id.clone()));
    let registry = build_registry(store);
    let method_count = registry.method_names().len();

    let session = SessionSettings {
        account_id: config.account_id.clone(),
        username: config.username.clone(),
        limits: RequestLimits {
            max_calls_in_request: config.max_calls_in_request,
        },
    };
    let state = AppState::new(config.api_token.clone(), session, registry);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        account_id = %config.account_id,
        methods = method_count,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
