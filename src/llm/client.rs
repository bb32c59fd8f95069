// src/llm/client.rs

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::JunoConfig;

use super::{CompletionModel, CompletionRequest};

/// Embedding model used by the reserved embeddings path.
const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// HTTP client for an OpenAI-style completions API.
///
/// Built once at startup; the per-request timeout comes from configuration
/// so a slow provider cannot hold a chat request open indefinitely. A blank
/// API key is allowed at construction; every call then fails fast and the
/// degraded paths take over.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAIClient {
    pub fn new(config: &JunoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            api_base: config.openai_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn ensure_key(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("OPENAI_API_KEY is not configured"));
        }
        Ok(())
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/v1/{}", self.api_base, endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed to send", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Provider API error {}: {}", status, error_text));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", endpoint))
    }
}

#[async_trait]
impl CompletionModel for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.ensure_key()?;

        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if request.json_response {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self.post_json("chat/completions", &body).await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("No content in completion response"))?;

        Ok(content.to_string())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.ensure_key()?;

        let body = json!({
            "model": EMBEDDING_MODEL,
            "input": text,
        });

        let response = self.post_json("embeddings", &body).await?;
        let values = response["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| anyhow!("No embedding in response"))?;

        Ok(values
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect())
    }
}
