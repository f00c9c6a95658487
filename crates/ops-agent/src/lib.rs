//! ops-agent: Conversational Agent Integration
//!
//! # Modules
//!
//! - `runtime`: agent runtime port, completion accumulation and a scripted double
//! - `bedrock`: Bedrock agent runtime adapter
//! - `bridge`: alert event to agent instruction bridge
//! - `session`: session identifiers

pub mod bedrock;
pub mod bridge;
pub mod runtime;
pub mod session;

// Re-export main types
pub use bedrock::BedrockAgent;
pub use bridge::{AlertBridge, BridgeResponse, BridgeState};
pub use runtime::{collect_completion, complete, AgentRuntime, CompletionStream, InvokeRequest, ScriptedAgent};
pub use session::new_session_id;
