mod anthropic;
mod embeddings;

pub use anthropic::AnthropicClient;
pub use embeddings::HttpEmbedder;

use async_trait::async_trait;

use crate::error::Result;

/// The language-model capability the scorer and learner need. One
/// prompt in, raw completion text out.
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    async fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String>;
}

/// Batched text-to-vector capability. Output order matches input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Retries a provider call with exponential backoff. Retryable
/// failures (network, non-2xx, malformed responses) are retried until
/// the budget runs out; everything else surfaces immediately.
pub(crate) async fn with_retry<T, F, Fut>(max_attempts: u32, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let delay = std::time::Duration::from_millis(500 * 2u64.pow(attempt));
                tracing::warn!(
                    "Provider call failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    max_attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppError::Provider("connection reset".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retry_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::Provider("timeout".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn format_errors_are_retried_like_transport_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(AppError::ProviderFormat("not json".to_string()))
                } else {
                    Ok("scores")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "scores");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::Validation("bad input".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
