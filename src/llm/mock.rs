//! Mock Atlas client for tests and offline demos.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{FxLensError, Result};
use crate::llm::types::{CompletionOptions, Message, Role};
use crate::llm::LlmClient;

/// Returns canned replies chosen by substring match on the last user message.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Vec<(String, String)>,
    failure: Option<String>,
    unhealthy: bool,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies with `response` when the user message contains `pattern` (case-insensitive).
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.responses
            .push((pattern.into().to_lowercase(), response.into()));
        self
    }

    /// Fails every completion with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Fails health checks.
    pub fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply_for(&self, input: &str) -> String {
        let input = input.to_lowercase();

        if let Some((_, response)) = self
            .responses
            .iter()
            .find(|(pattern, _)| input.contains(pattern.as_str()))
        {
            return response.clone();
        }

        if input.contains("learn more") {
            return "https://www.babypips.com/learn/forex/pips-and-pipettes".to_string();
        }
        if input.contains("business terms") {
            return "This looks at how far EUR/USD moved in the selected window.".to_string();
        }
        if input.contains("average") && input.contains("range") {
            return "```sql\nSELECT AVG(pip_hl) AS avg_range_pips FROM forex_bars \
                    WHERE CAST(\"datetime\" AS date) BETWEEN :start_date AND :end_date;\n```"
                .to_string();
        }

        "NONE".to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message], _options: CompletionOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(FxLensError::llm(message.clone()));
        }

        let input = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(self.reply_for(input))
    }

    async fn health_check(&self) -> Result<()> {
        if self.unhealthy {
            Err(FxLensError::llm("mock Atlas is offline"))
        } else {
            Ok(())
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
