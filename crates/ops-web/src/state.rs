//! Application State

use std::sync::Arc;
use std::time::Instant;

use ops_agent::AgentRuntime;

use crate::session::SessionSigner;

/// State shared across all handlers
pub struct AppState {
    /// Agent answering chat turns
    pub agent: Arc<dyn AgentRuntime>,
    /// Signs and verifies the session cookie
    pub signer: SessionSigner,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(agent: Arc<dyn AgentRuntime>, signer: SessionSigner) -> Self {
        Self {
            agent,
            signer,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
