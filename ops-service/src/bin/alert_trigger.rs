//! ops-alert-trigger: Lambda entry point for alert events

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;

use ops_agent::{AlertBridge, BridgeResponse};
use ops_core::{config, logging, Settings};

async fn handler(bridge: &AlertBridge, event: LambdaEvent<Value>) -> Result<BridgeResponse, Error> {
    Ok(ops_service::handle_alert(bridge, event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    config::load_environment();
    let settings = Settings::from_env()?;
    logging::init("info,ops_agent=debug", settings.log_format);

    let bridge = ops_service::alert_bridge(&settings).await?;
    info!(region = %settings.aws_region, "Alert trigger ready");

    let bridge = &bridge;
    run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(bridge, event).await
    }))
    .await
}
