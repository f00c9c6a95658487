//! Bedrock agent runtime adapter

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockagentruntime::types::ResponseStream;
use aws_sdk_bedrockagentruntime::Client;
use aws_smithy_types::error::display::DisplayErrorContext;
use futures::stream::{self, StreamExt};
use tracing::debug;

use ops_core::Settings;

use crate::runtime::{AgentRuntime, CompletionStream, InvokeRequest};

/// Invokes a deployed agent alias
#[derive(Clone)]
pub struct BedrockAgent {
    client: Client,
    agent_id: String,
    agent_alias_id: String,
}

impl BedrockAgent {
    pub fn new(client: Client, agent_id: impl Into<String>, agent_alias_id: impl Into<String>) -> Self {
        Self {
            client,
            agent_id: agent_id.into(),
            agent_alias_id: agent_alias_id.into(),
        }
    }

    /// Client for the configured region and agent; the agent id is required
    pub async fn from_settings(settings: &Settings) -> ops_core::Result<Self> {
        let agent_id = settings.require_agent_id()?.to_string();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.aws_region.clone()))
            .load()
            .await;

        Ok(Self::new(
            Client::new(&sdk_config),
            agent_id,
            settings.agent_alias_id.clone(),
        ))
    }
}

#[async_trait]
impl AgentRuntime for BedrockAgent {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn invoke(&self, request: &InvokeRequest) -> Result<CompletionStream> {
        debug!(
            agent_id = %self.agent_id,
            session_id = %request.session_id,
            "Invoking agent"
        );

        let output = self
            .client
            .invoke_agent()
            .agent_id(&self.agent_id)
            .agent_alias_id(&self.agent_alias_id)
            .session_id(&request.session_id)
            .input_text(&request.input_text)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))?;

        // Chunk events carry completion bytes; trace and file events are skipped.
        let chunks = stream::unfold(Some(output.completion), |receiver| async move {
            let mut receiver = receiver?;
            loop {
                match receiver.recv().await {
                    Ok(Some(ResponseStream::Chunk(part))) => {
                        if let Some(blob) = part.bytes() {
                            return Some((Ok(blob.as_ref().to_vec()), Some(receiver)));
                        }
                    }
                    Ok(Some(_)) => continue,
                    Ok(None) => return None,
                    Err(e) => return Some((Err(anyhow!("{}", DisplayErrorContext(e))), None)),
                }
            }
        });

        Ok(chunks.boxed())
    }
}
