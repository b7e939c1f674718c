//! LLM integration for FXLens.
//!
//! Atlas talks to an OpenAI-compatible endpoint (LM Studio by default). It is
//! off unless enabled in the configuration or on the command line.

pub mod atlas;
pub mod links;
pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use atlas::{Atlas, AtlasStatus, GenerationError};
pub use links::LinkValidator;
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::{extract_sql, extract_urls, parse_generated_sql, RejectedSql};
pub use types::{CompletionOptions, Message, Role};

use async_trait::async_trait;

use crate::error::Result;

/// A chat-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the assistant reply for `messages`.
    async fn complete(&self, messages: &[Message], options: CompletionOptions) -> Result<String>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Short label for status lines.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_implements_trait() {
        let client: Box<dyn LlmClient> = Box::new(MockLlmClient::new());
        let reply = client
            .complete(
                &[Message::user("What was the average daily range?")],
                CompletionOptions::default(),
            )
            .await
            .unwrap();
        assert!(reply.contains("SELECT"));
    }
}
