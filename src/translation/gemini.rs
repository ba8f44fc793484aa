use crate::translation::traits::LanguageService;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base(api_key, model, API_BASE)
    }

    /// Create a client against a custom endpoint (proxies, local mocks)
    pub fn with_base(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.into(),
        })
    }

    fn extract_text(data: &Value) -> Result<String> {
        if let Some(error) = data.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            anyhow::bail!("API error: {}", message);
        }

        let parts = data
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .context("Response missing candidate content")?;

        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();

        if text.is_empty() {
            anyhow::bail!("Response contained no text");
        }
        Ok(text)
    }
}

#[async_trait]
impl LanguageService for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        debug!(model = %self.model, prompt_len = prompt.len(), "calling language service");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .context("Failed to reach language service")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        let data: Value = serde_json::from_str(&body)
            .with_context(|| format!("Language service returned non-JSON ({})", status))?;

        if !status.is_success() {
            warn!("Language service returned status: {}", status);
        }
        Self::extract_text(&data)
    }

    fn service_name(&self) -> &'static str {
        "Gemini"
    }
}
