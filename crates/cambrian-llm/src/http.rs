//! Local HTTP provider (Ollama-compatible endpoint)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::intent::{self, ActionIntent};
use crate::provider::{LlmError, TalkContext, TalkProvider};

#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Talk provider backed by an Ollama-style `/api/generate` endpoint.
///
/// Every transport or decode failure maps to an [`LlmError`]; nothing here
/// panics, and the orchestrator turns any error into a silent turn.
pub struct HttpProvider {
    config: HttpProviderConfig,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::connection_failed(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn build_prompt(&self, agent_id: &str, ctx: &TalkContext) -> String {
        let mut prompt = format!(
            "You are {agent_id}, an agent in round {} with {:.1} energy.\n",
            ctx.round, ctx.energy
        );
        if !ctx.tool_names.is_empty() {
            prompt.push_str(&format!("Available tools: {}.\n", ctx.tool_names.join(", ")));
        }
        for line in &ctx.recent {
            prompt.push_str(&format!("Recently heard: {line}\n"));
        }
        prompt.push_str(
            "Say what you will do this round. To act, include a JSON object \
             like {\"tool\": \"name\", \"params\": {...}}.\n",
        );
        prompt
    }

    fn map_error(err: reqwest::Error, timeout: Duration) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(timeout.as_millis() as u64)
        } else if err.is_connect() {
            LlmError::connection_failed(err.to_string())
        } else {
            LlmError::request_failed(err.to_string())
        }
    }
}

#[async_trait]
impl TalkProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate_talk(&self, agent_id: &str, ctx: &TalkContext) -> Result<String, LlmError> {
        let prompt = self.build_prompt(agent_id, ctx);
        let url = format!("{}/api/generate", self.config.base_url);
        debug!(agent = agent_id, model = %self.config.model, "requesting talk");

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt: &prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| Self::map_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(LlmError::request_failed(format!(
                "status {}",
                response.status()
            )));
        }
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(e.to_string()))?;
        Ok(body.response)
    }

    async fn parse_intent(&self, text: &str) -> Result<ActionIntent, LlmError> {
        // Intent extraction is local; a second model round-trip buys nothing
        // when the talk already carries the JSON block.
        Ok(intent::parse(text))
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "provider health probe failed");
                false
            }
        }
    }
}
