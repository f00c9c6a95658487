//! ops-action-handler: Lambda entry point for agent action-group calls

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;

use ops_core::{config, logging, ActionResponse, Settings};
use ops_tools::ActionRouter;

async fn handler(router: &ActionRouter, event: LambdaEvent<Value>) -> Result<ActionResponse, Error> {
    Ok(ops_service::handle_action(router, event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    config::load_environment();
    let settings = Settings::from_env()?;
    logging::init("info,ops_tools=debug,ops_backends=debug", settings.log_format);

    let router = ops_service::action_router(&settings).await?;
    info!(
        cluster = %router.config().cluster_name,
        operations = router.registry().len(),
        "Action handler ready"
    );

    let router = &router;
    run(service_fn(move |event: LambdaEvent<Value>| async move {
        handler(router, event).await
    }))
    .await
}
