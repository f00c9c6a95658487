//! Agent runtime port
//!
//! An agent invocation yields a stream of completion chunks. Chunks are raw
//! bytes; a multi-byte character may straddle two chunks, so text is only
//! decoded once the stream has finished.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One turn sent to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub session_id: String,
    pub input_text: String,
}

impl InvokeRequest {
    pub fn new(session_id: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            input_text: input_text.into(),
        }
    }
}

/// Completion chunks in arrival order
pub type CompletionStream = BoxStream<'static, Result<Vec<u8>>>;

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Agent identifier reported by the health endpoint
    fn agent_id(&self) -> &str;

    async fn invoke(&self, request: &InvokeRequest) -> Result<CompletionStream>;
}

/// Concatenate every chunk and decode the result as UTF-8
pub async fn collect_completion(mut stream: CompletionStream) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    String::from_utf8(buf).map_err(|e| anyhow!("Agent completion is not valid UTF-8: {}", e))
}

/// Invoke and wait for the full completion
pub async fn complete(runtime: &dyn AgentRuntime, request: &InvokeRequest) -> ops_core::Result<String> {
    let stream = runtime
        .invoke(request)
        .await
        .map_err(|e| ops_core::Error::agent(e.to_string()))?;
    collect_completion(stream)
        .await
        .map_err(|e| ops_core::Error::agent(e.to_string()))
}

/// Agent double replaying fixed chunks
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    agent_id: String,
    chunks: Vec<Vec<u8>>,
    /// Fail the invocation itself
    failure: Option<String>,
    /// Fail mid-stream after the scripted chunks
    stream_failure: Option<String>,
    requests: Mutex<Vec<InvokeRequest>>,
}

impl ScriptedAgent {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    /// Reply with `text` split into chunks of at most `chunk_size` bytes
    pub fn replying(agent_id: impl Into<String>, text: &str, chunk_size: usize) -> Self {
        let chunks = text
            .as_bytes()
            .chunks(chunk_size.max(1))
            .map(<[u8]>::to_vec)
            .collect();
        Self {
            chunks,
            ..Self::new(agent_id)
        }
    }

    pub fn with_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn failing_mid_stream(mut self, message: impl Into<String>) -> Self {
        self.stream_failure = Some(message.into());
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<InvokeRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl AgentRuntime for ScriptedAgent {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn invoke(&self, request: &InvokeRequest) -> Result<CompletionStream> {
        self.requests.lock().await.push(request.clone());
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }

        let mut items: Vec<Result<Vec<u8>>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.stream_failure {
            items.push(Err(anyhow!("{}", message)));
        }
        Ok(stream::iter(items).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let text = "Pods look healthy ✅ no action needed";
        let agent = ScriptedAgent::replying("agent-1", text, 3);
        let reply = complete(&agent, &InvokeRequest::new("s-1", "status?"))
            .await
            .unwrap();
        assert_eq!(reply, text);
    }

    #[tokio::test]
    async fn test_invocation_failure_is_agent_error() {
        let agent = ScriptedAgent::new("agent-1").failing("ThrottlingException: Rate exceeded");
        let err = complete(&agent, &InvokeRequest::new("s-1", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ops_core::Error::Agent(_)));
        assert!(err.to_string().contains("Rate exceeded"));
    }

    #[tokio::test]
    async fn test_stream_failure_discards_partial_completion() {
        let agent = ScriptedAgent::replying("agent-1", "partial", 2).failing_mid_stream("stream reset");
        let err = complete(&agent, &InvokeRequest::new("s-1", "hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("stream reset"));
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let agent = ScriptedAgent::replying("agent-1", "ok", 8);
        complete(&agent, &InvokeRequest::new("s-9", "check nodes"))
            .await
            .unwrap();
        assert_eq!(
            agent.requests().await,
            vec![InvokeRequest::new("s-9", "check nodes")]
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let agent = ScriptedAgent::new("agent-1").with_chunks(vec![vec![0xff, 0xfe]]);
        assert!(complete(&agent, &InvokeRequest::new("s", "x")).await.is_err());
    }
}
