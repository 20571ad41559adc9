use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use wp_content_sync::app::{dispatch, RpcReply};
use wp_content_sync::core::ConfigProvider;
use wp_content_sync::utils::error::SyncError;
use wp_content_sync::utils::{logger, validation::Validate};
use wp_content_sync::{LambdaConfig, RestStore, SyncEngine};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl From<RpcReply> for Response {
    fn from(reply: RpcReply) -> Self {
        Self {
            status_code: reply.status,
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: reply.body.to_string(),
        }
    }
}

/// API Gateway 會把請求包成 `{"body": "<json>"}`；直接呼叫時事件本身就是請求
fn unwrap_body(event: Value) -> Result<Value, SyncError> {
    match event.get("body") {
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| SyncError::invalid_request(format!("Invalid JSON body: {}", e))),
        Some(Value::Null) | None => Ok(event),
        Some(other) => Ok(other.clone()),
    }
}

async fn function_handler(
    engine: &SyncEngine<RestStore>,
    event: LambdaEvent<Value>,
) -> Result<Response, Error> {
    tracing::info!("Handling request {}", event.context.request_id);

    let reply = match unwrap_body(event.payload) {
        Ok(body) => dispatch(engine, body).await,
        Err(e) => RpcReply::failure(&e),
    };

    tracing::info!("Request finished with status {}", reply.status);
    Ok(reply.into())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let config = LambdaConfig::from_env()?;
    config.validate()?;

    let store = RestStore::with_timeout(
        config.store_url.clone(),
        config.store_api_key.clone(),
        Duration::from_secs(config.timeout_seconds),
    )?;
    let engine = SyncEngine::new(store, config.settings());
    tracing::info!("🚀 wp-content-sync lambda ready, store {}", config.store_url);

    let engine = &engine;
    run(service_fn(move |event| async move {
        function_handler(engine, event).await
    }))
    .await
}
