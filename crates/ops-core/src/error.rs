//! Error types for ops-assist

use thiserror::Error;

use crate::types::StatusPolicy;

/// Main error type for dispatch, bridge and chat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown action group {action_group} for operation {api_path}")]
    UnknownActionGroup {
        action_group: String,
        api_path: String,
    },

    #[error("Unknown operation {api_path} in action group {action_group}")]
    UnknownOperation {
        action_group: String,
        api_path: String,
    },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A well-formed request the backend cannot serve (unsupported resource,
    /// no detector configured, ...)
    #[error("{0}")]
    Unsupported(String),

    /// The backend client raised; the message is passed through untouched
    #[error("{0}")]
    Upstream(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unknown-operation error
    pub fn unknown_operation(action_group: impl Into<String>, api_path: impl Into<String>) -> Self {
        Error::UnknownOperation {
            action_group: action_group.into(),
            api_path: api_path.into(),
        }
    }

    /// Create a missing-parameter error
    pub fn missing(name: impl Into<String>) -> Self {
        Error::MissingParameter(name.into())
    }

    /// Create an invalid-parameter error
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported-request error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create an upstream failure
    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::Upstream(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create an agent error
    pub fn agent(msg: impl Into<String>) -> Self {
        Error::Agent(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether the failure happened inside a backend call rather than while
    /// resolving or validating the request.
    pub fn is_raised(&self) -> bool {
        matches!(
            self,
            Error::Upstream(_)
                | Error::Timeout(_)
                | Error::Agent(_)
                | Error::Serialization(_)
                | Error::Internal(_)
        )
    }

    /// HTTP-like status code for the response envelope.
    ///
    /// Under [`StatusPolicy::Compatible`] only raised failures map to 500;
    /// resolution and validation errors ride on a 200 with an error body.
    pub fn status_code(&self, policy: StatusPolicy) -> u16 {
        match policy {
            StatusPolicy::Compatible if !self.is_raised() => 200,
            _ => 500,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Upstream(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_is_verbatim() {
        let err = Error::from(anyhow::anyhow!("AccessDenied: not authorized"));
        assert_eq!(err.to_string(), "AccessDenied: not authorized");
    }

    #[test]
    fn test_compatible_policy_status_codes() {
        let policy = StatusPolicy::Compatible;
        assert_eq!(Error::unknown_operation("g", "/x").status_code(policy), 200);
        assert_eq!(Error::missing("pod").status_code(policy), 200);
        assert_eq!(Error::invalid("tail", "not a number").status_code(policy), 200);
        assert_eq!(Error::unsupported("nope").status_code(policy), 200);
        assert_eq!(Error::upstream("boom").status_code(policy), 500);
        assert_eq!(Error::timeout("query").status_code(policy), 500);
    }

    #[test]
    fn test_unified_policy_status_codes() {
        let policy = StatusPolicy::Unified;
        assert_eq!(Error::unknown_operation("g", "/x").status_code(policy), 500);
        assert_eq!(Error::upstream("boom").status_code(policy), 500);
    }

    #[test]
    fn test_unknown_group_names_path() {
        let err = Error::UnknownActionGroup {
            action_group: "db-operations".into(),
            api_path: "/tables".into(),
        };
        assert_eq!(err.to_string(), "Unknown action group db-operations for operation /tables");
        assert_eq!(err.status_code(StatusPolicy::Compatible), 200);
    }

    #[test]
    fn test_unknown_operation_names_path() {
        let err = Error::unknown_operation("kubernetes-operations", "/kubectl/nope");
        let msg = err.to_string();
        assert!(msg.contains("/kubectl/nope"));
        assert!(msg.contains("kubernetes-operations"));
    }
}
