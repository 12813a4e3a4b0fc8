use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::{with_retry, EmbeddingProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRecord>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRecord {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-style `/v1/embeddings` endpoint.
pub struct HttpEmbedder {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl HttpEmbedder {
    pub fn new(api_url: String, api_key: String, model: String, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
            max_retries,
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Embedding API error {}: {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderFormat(e.to_string()))?;

        if body.data.len() != texts.len() {
            return Err(AppError::ProviderFormat(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        // The API reports an index per record; order by it so output
        // lines up with input.
        let mut records = body.data;
        records.sort_by_key(|r| r.index);
        Ok(records.into_iter().map(|r| r.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        with_retry(self.max_retries, || self.request(texts)).await
    }
}
