//! Common wire types used across ops-assist

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message version stamped on every action-group response
pub const MESSAGE_VERSION: &str = "1.0";

/// HTTP method reported back to the agent for every action
pub const HTTP_METHOD: &str = "POST";

/// How error outcomes map onto the envelope's `httpStatusCode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Raised backend failures are 500, everything else is 200 with an
    /// error body. Matches what deployed agents already expect.
    #[default]
    Compatible,
    /// Every error is 500
    Unified,
}

impl std::str::FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compatible" => Ok(StatusPolicy::Compatible),
            "unified" => Ok(StatusPolicy::Unified),
            other => Err(format!("Unknown status policy: {}", other)),
        }
    }
}

/// A single named parameter as sent by the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl ActionParameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            value: value.into(),
        }
    }
}

/// Inbound action-group invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInvocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_version: Option<String>,
    #[serde(default)]
    pub action_group: String,
    #[serde(default)]
    pub api_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_session_attributes: Option<Value>,
}

impl ActionInvocation {
    pub fn new(action_group: impl Into<String>, api_path: impl Into<String>) -> Self {
        Self {
            action_group: action_group.into(),
            api_path: api_path.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(ActionParameter::new(name, value));
        self
    }
}

/// `{"body": "<json string>"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBody {
    pub body: String,
}

/// Content-type keyed response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "application/json")]
    pub application_json: JsonBody,
}

/// Inner `response` object of the envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: ResponseBody,
}

/// Outbound envelope returned to the agent for every invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub message_version: String,
    pub response: ActionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_session_attributes: Option<Value>,
}

impl ActionResponse {
    /// Wrap an already-serialized JSON body
    pub fn new(
        action_group: impl Into<String>,
        api_path: impl Into<String>,
        status_code: u16,
        body: String,
    ) -> Self {
        Self {
            message_version: MESSAGE_VERSION.to_string(),
            response: ActionResult {
                action_group: action_group.into(),
                api_path: api_path.into(),
                http_method: HTTP_METHOD.to_string(),
                http_status_code: status_code,
                response_body: ResponseBody {
                    application_json: JsonBody { body },
                },
            },
            session_attributes: None,
            prompt_session_attributes: None,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.response.http_status_code
    }

    /// Parse the embedded body string back into JSON
    pub fn body_json(&self) -> crate::Result<Value> {
        Ok(serde_json::from_str(
            &self.response.response_body.application_json.body,
        )?)
    }
}

/// Inbound alert from the event bus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(default)]
    pub detail: Value,
    #[serde(default, rename = "detail-type", skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_invocation_deserializes_agent_payload() {
        let raw = json!({
            "messageVersion": "1.0",
            "actionGroup": "kubernetes-operations",
            "apiPath": "/kubectl/logs",
            "httpMethod": "POST",
            "parameters": [
                {"name": "pod", "type": "string", "value": "web-1"},
                {"name": "tail", "type": "integer", "value": "20"}
            ],
            "sessionAttributes": {"team": "sre"}
        });

        let inv: ActionInvocation = serde_json::from_value(raw).unwrap();
        assert_eq!(inv.action_group, "kubernetes-operations");
        assert_eq!(inv.api_path, "/kubectl/logs");
        assert_eq!(inv.parameters.len(), 2);
        assert_eq!(inv.parameters[1].kind.as_deref(), Some("integer"));
        assert_eq!(inv.session_attributes, Some(json!({"team": "sre"})));
    }

    #[test]
    fn test_invocation_tolerates_missing_fields() {
        let inv: ActionInvocation = serde_json::from_value(json!({})).unwrap();
        assert!(inv.action_group.is_empty());
        assert!(inv.parameters.is_empty());
    }

    #[test]
    fn test_response_envelope_shape() {
        let resp = ActionResponse::new("aws-operations", "/tools/list", 200, "{\"a\":1}".into());
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            value,
            json!({
                "messageVersion": "1.0",
                "response": {
                    "actionGroup": "aws-operations",
                    "apiPath": "/tools/list",
                    "httpMethod": "POST",
                    "httpStatusCode": 200,
                    "responseBody": {
                        "application/json": {"body": "{\"a\":1}"}
                    }
                }
            })
        );
        assert_eq!(resp.body_json().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_status_policy_parse() {
        assert_eq!("Unified".parse::<StatusPolicy>().unwrap(), StatusPolicy::Unified);
        assert!("strict".parse::<StatusPolicy>().is_err());
    }
}
