//! Deterministic mock provider for tests and offline runs

use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::intent::{self, ActionIntent};
use crate::provider::{LlmError, TalkContext, TalkProvider};

/// Cycles through a fixed list of talk lines; intent parsing runs the same
/// local parser the real providers use. Always available.
pub struct MockProvider {
    responses: Vec<String>,
    index: AtomicUsize,
    /// Optional artificial latency ceiling, for exercising solicit timeouts
    jitter: Option<Duration>,
}

impl MockProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            index: AtomicUsize::new(0),
            jitter: None,
        }
    }

    /// A provider that always answers with the same line.
    pub fn constant(line: &str) -> Self {
        Self::new(vec![line.to_string()])
    }

    /// Sleep a random duration up to `max` before each response.
    pub fn with_jitter(mut self, max: Duration) -> Self {
        self.jitter = Some(max);
        self
    }

    async fn simulate_latency(&self) {
        if let Some(max) = self.jitter {
            let micros = rand::rng().random_range(0..=max.as_micros() as u64);
            tokio::time::sleep(Duration::from_micros(micros)).await;
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec![
            "I should build something useful this round.".to_string(),
            r#"{"tool": "echo", "params": {"message": "hello"}}"#.to_string(),
            "Thinking about what the others have made.".to_string(),
        ])
    }
}

#[async_trait]
impl TalkProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_talk(&self, agent_id: &str, ctx: &TalkContext) -> Result<String, LlmError> {
        self.simulate_latency().await;
        if self.responses.is_empty() {
            return Err(LlmError::invalid_response("mock has no responses"));
        }
        let i = self.index.fetch_add(1, Ordering::Relaxed) % self.responses.len();
        debug!(agent = agent_id, round = ctx.round, index = i, "mock talk");
        Ok(self.responses[i].clone())
    }

    async fn parse_intent(&self, text: &str) -> Result<ActionIntent, LlmError> {
        self.simulate_latency().await;
        Ok(intent::parse(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cycles_through_responses() {
        let mock = MockProvider::new(vec!["one".into(), "two".into()]);
        let ctx = TalkContext::default();
        assert_eq!(mock.generate_talk("agent_1", &ctx).await.unwrap(), "one");
        assert_eq!(mock.generate_talk("agent_1", &ctx).await.unwrap(), "two");
        assert_eq!(mock.generate_talk("agent_1", &ctx).await.unwrap(), "one");
    }

    #[tokio::test]
    async fn empty_mock_is_an_error_not_a_panic() {
        let mock = MockProvider::new(Vec::new());
        let err = mock
            .generate_talk("agent_1", &TalkContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn parses_its_own_talk() {
        let mock = MockProvider::default();
        let intent = mock
            .parse_intent(r#"{"tool": "echo", "params": {"message": "hi"}}"#)
            .await
            .unwrap();
        assert_eq!(intent.tool_name.as_deref(), Some("echo"));
    }
}
