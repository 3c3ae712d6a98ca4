//! Ollama-backed [`TextGenerator`].
//!
//! Talks to the `/api/chat` endpoint with a system + user message pair and
//! `stream: false`. Transport failures and responses without message content
//! are errors; the life cycle treats them as an abandoned tick.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;

use super::TextGenerator;
use crate::config::LlmConfig;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let endpoint = format!("{}/api/chat", self.base_url);
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "stream": false,
        });

        let response = self
            .client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Ollama unavailable at {}", self.base_url))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .context("failed to read Ollama response body")?;

        anyhow::ensure!(
            status.is_success(),
            "Ollama returned {status} for model '{}': {body}",
            self.model
        );

        body.pointer("/message/content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Ollama response missing message content: {body}"))
    }
}
