//! Validation of suggested learn-more links.
//!
//! A link is kept only if it resolves (status below 400, following redirects)
//! to an HTML page. `HEAD` is tried first; many sites reject it, so a `GET`
//! follows when it does not succeed.

use futures::future::join_all;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use crate::error::{FxLensError, Result};

/// Links shown with a generated answer.
pub const MAX_LINKS: usize = 3;

const HEAD_TIMEOUT_SECS: u64 = 6;

const GET_TIMEOUT_SECS: u64 = 8;

const AGENT: &str = concat!("FXLens/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct LinkValidator {
    client: Client,
}

impl LinkValidator {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FxLensError::llm(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Returns up to `max` reachable HTML links, in their original order.
    pub async fn filter_valid(&self, candidates: &[String], max: usize) -> Vec<String> {
        let checks = candidates.iter().map(|url| self.is_reachable(url));
        let results = join_all(checks).await;

        candidates
            .iter()
            .zip(results)
            .filter_map(|(url, ok)| ok.then(|| url.clone()))
            .take(max)
            .collect()
    }

    /// Checks one URL.
    pub async fn is_reachable(&self, url: &str) -> bool {
        let head = self
            .client
            .head(url)
            .header(USER_AGENT, AGENT)
            .timeout(Duration::from_secs(HEAD_TIMEOUT_SECS))
            .send()
            .await;
        if head.as_ref().is_ok_and(is_html_page) {
            return true;
        }

        let get = self
            .client
            .get(url)
            .header(USER_AGENT, AGENT)
            .timeout(Duration::from_secs(GET_TIMEOUT_SECS))
            .send()
            .await;
        match get {
            Ok(response) => is_html_page(&response),
            Err(e) => {
                debug!("Dropping link {}: {}", url, e);
                false
            }
        }
    }
}

fn is_html_page(response: &Response) -> bool {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    response.status().as_u16() < 400 && is_html_content_type(content_type)
}

fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}
