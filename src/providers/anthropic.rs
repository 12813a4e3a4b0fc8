use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::{with_retry, ScoringProvider};

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            client,
            api_key,
            model,
            max_retries,
        })
    }

    async fn request(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: max_output_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let message_response: MessageResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderFormat(e.to_string()))?;

        let text = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(AppError::ProviderFormat(
                "response contained no text blocks".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl ScoringProvider for AnthropicClient {
    async fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        with_retry(self.max_retries, || self.request(prompt, max_output_tokens)).await
    }
}
