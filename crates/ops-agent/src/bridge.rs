//! Alert bridge
//!
//! Turns an inbound alert event into an agent instruction, runs one agent
//! turn under a fresh session and reports the outcome. Each event moves
//! through `Idle -> Invoking -> Done | Failed` exactly once; nothing is
//! retried or queued.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use ops_core::AlertEvent;

use crate::runtime::{complete, AgentRuntime, InvokeRequest};
use crate::session::new_session_id;

/// `detail.type` of security findings forwarded by the event bus
pub const SECURITY_FINDING_TYPE: &str = "GuardDuty Finding";

/// Lifecycle of one alert
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeState {
    Idle,
    Invoking { session_id: String },
    Done { session_id: String, response: String },
    Failed { error: String },
}

impl BridgeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Done { .. } | BridgeState::Failed { .. })
    }

    fn start(self, session_id: String) -> Self {
        match self {
            BridgeState::Idle => BridgeState::Invoking { session_id },
            other => other,
        }
    }

    fn finish(self, outcome: ops_core::Result<String>) -> Self {
        match (self, outcome) {
            (BridgeState::Invoking { session_id }, Ok(response)) => {
                BridgeState::Done { session_id, response }
            }
            (BridgeState::Invoking { .. }, Err(err)) => BridgeState::Failed {
                error: err.to_string(),
            },
            (other, _) => other,
        }
    }
}

/// `{statusCode, body}` returned to the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub status_code: u16,
    /// JSON text
    pub body: String,
}

impl BridgeResponse {
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

impl From<BridgeState> for BridgeResponse {
    fn from(state: BridgeState) -> Self {
        let (status_code, body) = match state {
            BridgeState::Done { session_id, response } => (
                200,
                json!({ "session_id": session_id, "response": response }),
            ),
            BridgeState::Failed { error } => (500, json!({ "error": error })),
            BridgeState::Idle | BridgeState::Invoking { .. } => {
                (500, json!({ "error": "alert handling did not complete" }))
            }
        };
        Self {
            status_code,
            body: body.to_string(),
        }
    }
}

/// Agent instruction for an alert `detail` object
pub fn instruction_for(detail: &Value) -> String {
    if detail.get("type").and_then(Value::as_str) == Some(SECURITY_FINDING_TYPE) {
        let severity = detail.get("severity").map(plain).unwrap_or_else(|| "0".to_string());
        let finding_type = detail.get("type").map(plain).unwrap_or_else(|| "Unknown".to_string());
        let resource = detail.get("resource").cloned().unwrap_or_else(|| json!({}));
        format!(
            "GuardDuty critical finding detected: Severity={}, Type={}, Resource={}. Investigate and remediate.",
            severity, finding_type, resource
        )
    } else {
        let detail = if detail.is_null() { json!({}) } else { detail.clone() };
        format!("Alert received: {}", detail)
    }
}

/// Strings without quotes, everything else as JSON text
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Forwards alerts to the agent
#[derive(Clone)]
pub struct AlertBridge {
    runtime: Arc<dyn AgentRuntime>,
}

impl AlertBridge {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    /// Handle one alert to completion
    pub async fn handle(&self, event: &AlertEvent) -> BridgeResponse {
        debug!(detail = %event.detail, "Alert received");
        let instruction = instruction_for(&event.detail);

        let session_id = new_session_id();
        let state = BridgeState::Idle.start(session_id.clone());

        let request = InvokeRequest::new(session_id.as_str(), instruction);
        let state = state.finish(complete(self.runtime.as_ref(), &request).await);

        match &state {
            BridgeState::Done { response, .. } => {
                info!(%session_id, chars = response.len(), "Agent handled alert")
            }
            BridgeState::Failed { error } => error!(%session_id, %error, "Agent invocation failed"),
            _ => {}
        }
        state.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ScriptedAgent;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_security_finding_instruction() {
        let detail = json!({
            "type": "GuardDuty Finding",
            "severity": 8,
            "resource": {"instanceId": "i-1"}
        });
        assert_eq!(
            instruction_for(&detail),
            "GuardDuty critical finding detected: Severity=8, Type=GuardDuty Finding, \
             Resource={\"instanceId\":\"i-1\"}. Investigate and remediate."
        );
    }

    #[test]
    fn test_finding_defaults() {
        let instruction = instruction_for(&json!({"type": "GuardDuty Finding"}));
        assert!(instruction.contains("Severity=0"));
        assert!(instruction.contains("Resource={}"));
    }

    #[test]
    fn test_generic_alert_instruction() {
        let detail = json!({"alarm": "HighCPU"});
        assert_eq!(instruction_for(&detail), "Alert received: {\"alarm\":\"HighCPU\"}");
        assert_eq!(instruction_for(&Value::Null), "Alert received: {}");
    }

    #[test]
    fn test_state_transitions() {
        let state = BridgeState::Idle.start("s-1".into());
        assert_eq!(state, BridgeState::Invoking { session_id: "s-1".into() });
        assert!(!state.is_terminal());

        let done = state.clone().finish(Ok("ok".into()));
        assert!(done.is_terminal());

        let failed = state.finish(Err(ops_core::Error::agent("boom")));
        assert_eq!(failed, BridgeState::Failed { error: "Agent error: boom".into() });

        // terminal states do not move again
        assert_eq!(done.clone().start("s-2".into()), done);
    }

    #[tokio::test]
    async fn test_handle_success_uses_fresh_session() {
        let agent = ScriptedAgent::replying("agent-1", "Isolated instance i-1", 4).into_shared();
        let bridge = AlertBridge::new(agent.clone());
        let event = AlertEvent {
            detail: json!({"type": "GuardDuty Finding", "severity": 8, "resource": {"instanceId": "i-1"}}),
            ..Default::default()
        };

        let first = bridge.handle(&event).await;
        let second = bridge.handle(&event).await;

        assert_eq!(first.status_code, 200);
        let body = first.body_json().unwrap();
        assert_eq!(body["response"], "Isolated instance i-1");
        let session_id = body["session_id"].as_str().unwrap();
        assert!(!session_id.is_empty());
        assert_ne!(second.body_json().unwrap()["session_id"], body["session_id"]);

        let requests = agent.requests().await;
        assert_eq!(requests[0].session_id, session_id);
        assert!(requests[0].input_text.contains("Severity=8"));
    }

    #[tokio::test]
    async fn test_handle_failure_is_500() {
        let agent = ScriptedAgent::new("agent-1").failing("AccessDeniedException");
        let bridge = AlertBridge::new(Arc::new(agent));
        let response = bridge.handle(&AlertEvent::default()).await;

        assert_eq!(response.status_code, 500);
        let body = response.body_json().unwrap();
        assert!(body["error"].as_str().unwrap().contains("AccessDeniedException"));
    }
}
