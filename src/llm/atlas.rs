//! Atlas, the optional LLM fallback.
//!
//! When no curated query matches, Atlas can be asked to write SQL for the
//! question, explain it in business terms and suggest further reading.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{FxLensError, Result};
use crate::llm::links::{LinkValidator, MAX_LINKS};
use crate::llm::openai::{OpenAiClient, OpenAiConfig};
use crate::llm::parser::{extract_urls, parse_generated_sql, RejectedSql};
use crate::llm::prompt::{interpretation_messages, links_messages, sql_messages};
use crate::llm::types::CompletionOptions;
use crate::llm::LlmClient;

/// Reachability of the Atlas endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtlasStatus {
    Disabled,
    Online(String),
    Offline(String),
}

impl fmt::Display for AtlasStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Online(model) => write!(f, "online ({model})"),
            Self::Offline(reason) => write!(f, "offline: {reason}"),
        }
    }
}

/// Why Atlas could not produce usable SQL.
#[derive(Debug)]
pub enum GenerationError {
    /// The reply was not a usable query.
    Rejected(RejectedSql),
    /// The request itself failed.
    Request(FxLensError),
}

impl GenerationError {
    /// Text recorded in the unanswered log's `failed_sql` column.
    pub fn failed_sql(&self) -> String {
        match self {
            Self::Rejected(rejected) => rejected.sql.clone(),
            Self::Request(error) => format!("ERROR: {error}"),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(rejected) => f.write_str(&rejected.reason),
            Self::Request(error) => write!(f, "{error}"),
        }
    }
}

pub struct Atlas {
    client: Arc<dyn LlmClient>,
    links: Option<LinkValidator>,
}

impl Atlas {
    /// Wraps a client. Suggested links are used as returned, without validation.
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            links: None,
        }
    }

    /// Builds Atlas against the configured OpenAI-compatible endpoint.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = OpenAiClient::new(OpenAiConfig::from(config))?;
        info!("Atlas enabled: {}", client.describe());
        Ok(Self::new(Arc::new(client)).with_link_validation(LinkValidator::new()?))
    }

    /// Checks suggested links over HTTP before returning them.
    pub fn with_link_validation(mut self, validator: LinkValidator) -> Self {
        self.links = Some(validator);
        self
    }

    pub fn describe(&self) -> String {
        self.client.describe()
    }

    pub async fn status(&self) -> AtlasStatus {
        match self.client.health_check().await {
            Ok(()) => AtlasStatus::Online(self.client.describe()),
            Err(e) => AtlasStatus::Offline(e.to_string()),
        }
    }

    /// Asks for SQL answering `question` and sanity-checks the reply.
    pub async fn generate_sql(&self, question: &str) -> std::result::Result<String, GenerationError> {
        let reply = self
            .client
            .complete(&sql_messages(question), CompletionOptions::SQL)
            .await
            .map_err(GenerationError::Request)?;
        debug!("Atlas replied with {} characters", reply.len());

        parse_generated_sql(&reply).map_err(GenerationError::Rejected)
    }

    /// Business-level explanation of `question`. Failures yield `None`.
    pub async fn interpret(&self, question: &str) -> Option<String> {
        match self
            .client
            .complete(&interpretation_messages(question), CompletionOptions::INTERPRETATION)
            .await
        {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                warn!("Atlas interpretation failed: {}", e);
                None
            }
        }
    }

    /// Up to three links about `topic`. Failures yield an empty list.
    pub async fn learn_more(&self, topic: &str) -> Vec<String> {
        let reply = match self
            .client
            .complete(&links_messages(topic), CompletionOptions::LINKS)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Atlas link suggestions failed: {}", e);
                return Vec::new();
            }
        };

        let candidates = extract_urls(&reply);
        match &self.links {
            Some(validator) => validator.filter_valid(&candidates, MAX_LINKS).await,
            None => candidates.into_iter().take(MAX_LINKS).collect(),
        }
    }
}
