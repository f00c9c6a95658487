//! ops-service: entry point wiring
//!
//! Shared by the Lambda handlers and the `ops` CLI: builds the action router
//! and the alert bridge from settings, and turns raw event JSON into
//! responses.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use ops_agent::{AlertBridge, BedrockAgent, BridgeResponse};
use ops_core::{ActionInvocation, ActionResponse, AlertEvent, Error, Settings};
use ops_tools::stub::StubBackends;
use ops_tools::{ActionRouter, RouterConfig};

/// Cluster name used by the stub backends when none is configured
pub const STUB_CLUSTER: &str = "stub-cluster";

/// Router over the production backends
pub async fn action_router(settings: &Settings) -> anyhow::Result<ActionRouter> {
    let config = RouterConfig::from_settings(settings)?;
    let backends = ops_backends::connect(settings).await?;
    Ok(ActionRouter::new(backends, config))
}

/// Router over the sample stub backends
pub fn stub_router(settings: &Settings) -> ActionRouter {
    let cluster = settings.cluster_name.as_deref().unwrap_or(STUB_CLUSTER);
    let config = RouterConfig::new(cluster)
        .with_status_policy(settings.status_policy)
        .with_poll(settings.into());
    let (_, backends) = StubBackends::sample().into_backends();
    ActionRouter::new(backends, config)
}

/// Bridge over the configured agent
pub async fn alert_bridge(settings: &Settings) -> anyhow::Result<AlertBridge> {
    let agent = BedrockAgent::from_settings(settings).await?;
    Ok(AlertBridge::new(Arc::new(agent)))
}

/// Answer a raw action-group event; malformed events still get an envelope
pub async fn handle_action(router: &ActionRouter, event: Value) -> ActionResponse {
    match serde_json::from_value::<ActionInvocation>(event) {
        Ok(invocation) => router.respond(&invocation).await,
        Err(e) => {
            let err = Error::from(e);
            let status = err.status_code(router.config().status_policy);
            warn!(status, error = %err, "Malformed action invocation");
            ActionResponse::new("", "", status, json!({ "error": err.to_string() }).to_string())
        }
    }
}

/// Answer a raw alert event; anything that is not an event object is
/// treated as an alert without detail
pub async fn handle_alert(bridge: &AlertBridge, event: Value) -> BridgeResponse {
    debug!(%event, "Alert event received");
    let event: AlertEvent = serde_json::from_value(event).unwrap_or_default();
    bridge.handle(&event).await
}
