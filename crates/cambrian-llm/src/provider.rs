//! The talk-provider contract
//!
//! Two operations: generate an agent's free-form "talk" for the round, and
//! parse talk into an action intent. Both degrade rather than abort — the
//! orchestrator maps every [`LlmError`] to a silent turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intent::ActionIntent;

/// Errors from talk generation or intent parsing.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("provider not available: {0}")]
    NotAvailable(String),
}

impl LlmError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// What the agent knows when it speaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TalkContext {
    pub energy: f64,
    pub round: u32,
    /// Tool names visible to this agent (own plus population)
    pub tool_names: Vec<String>,
    /// Most recent talk lines from the population, oldest first
    pub recent: Vec<String>,
}

/// A source of agent talk and intent parsing.
#[async_trait]
pub trait TalkProvider: Send + Sync {
    /// Provider name for logs and the CLI
    fn name(&self) -> &str;

    /// Produce one round of free-form talk for an agent.
    async fn generate_talk(&self, agent_id: &str, ctx: &TalkContext) -> Result<String, LlmError>;

    /// Parse talk into an action intent. Unparseable talk is not an error:
    /// providers return [`ActionIntent::none`] instead.
    async fn parse_intent(&self, text: &str) -> Result<ActionIntent, LlmError>;

    /// Liveness probe. Defaults to available.
    async fn is_available(&self) -> bool {
        true
    }
}
