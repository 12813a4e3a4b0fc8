use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Article, Exclusion, Interest, RefType};
use crate::providers::EmbeddingProvider;

/// Cosine similarity in [-1, 1]. Zero for mismatched or zero-norm
/// inputs rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Truncates to at most `max_bytes`, backing up to a char boundary so
/// multibyte text is never split.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn interest_text(interest: &Interest) -> String {
    match &interest.description {
        Some(desc) if !desc.is_empty() => format!("{}. {}", interest.category, desc),
        _ => interest.category.clone(),
    }
}

fn exclusion_text(exclusion: &Exclusion) -> String {
    match &exclusion.description {
        Some(desc) if !desc.is_empty() => format!("{}. {}", exclusion.category, desc),
        _ => exclusion.category.clone(),
    }
}

fn article_text(article: &Article, excerpt_bytes: usize) -> String {
    let excerpt = article
        .content
        .as_deref()
        .map(|c| truncate_to_char_boundary(c, excerpt_bytes))
        .unwrap_or("");
    if excerpt.is_empty() {
        article.title.clone()
    } else {
        format!("{}\n\n{}", article.title, excerpt)
    }
}

/// Generates and persists vectors for interests, exclusions and
/// articles, one row per (ref type, ref id). Stored vectors are reused
/// as long as the text that produced them is unchanged.
pub struct EmbeddingStore {
    repo: Arc<Repository>,
    provider: Arc<dyn EmbeddingProvider>,
    excerpt_bytes: usize,
}

impl EmbeddingStore {
    pub fn new(
        repo: Arc<Repository>,
        provider: Arc<dyn EmbeddingProvider>,
        excerpt_bytes: usize,
    ) -> Self {
        Self {
            repo,
            provider,
            excerpt_bytes,
        }
    }

    pub async fn ensure_interest_embeddings(
        &self,
        interests: &[Interest],
    ) -> Result<HashMap<i64, Vec<f32>>> {
        let items: Vec<_> = interests
            .iter()
            .map(|i| (i.id, interest_text(i)))
            .collect();
        self.ensure_embeddings(RefType::Interest, items).await
    }

    pub async fn ensure_exclusion_embeddings(
        &self,
        exclusions: &[Exclusion],
    ) -> Result<HashMap<i64, Vec<f32>>> {
        let items: Vec<_> = exclusions
            .iter()
            .map(|e| (e.id, exclusion_text(e)))
            .collect();
        self.ensure_embeddings(RefType::Exclusion, items).await
    }

    pub async fn ensure_article_embeddings(
        &self,
        articles: &[Article],
    ) -> Result<HashMap<i64, Vec<f32>>> {
        let items: Vec<_> = articles
            .iter()
            .map(|a| (a.id, article_text(a, self.excerpt_bytes)))
            .collect();
        self.ensure_embeddings(RefType::Article, items).await
    }

    /// Returns whatever vectors are available after the pass: stored
    /// and still current, or freshly generated. A provider outage
    /// leaves the missing entries absent (the scorer treats a missing
    /// vector as a zero baseline) instead of failing the run.
    async fn ensure_embeddings(
        &self,
        ref_type: RefType,
        items: Vec<(i64, String)>,
    ) -> Result<HashMap<i64, Vec<f32>>> {
        let mut vectors = HashMap::new();
        let mut stale: Vec<(i64, String)> = Vec::new();

        for (id, text) in items {
            match self.repo.get_embedding(ref_type, id).await? {
                Some(stored) if stored.source_text == text && !stored.vector.is_empty() => {
                    vectors.insert(id, stored.vector);
                }
                _ => stale.push((id, text)),
            }
        }

        if stale.is_empty() {
            return Ok(vectors);
        }

        debug!(
            "Generating {} {} embeddings",
            stale.len(),
            ref_type.as_str()
        );

        let texts: Vec<String> = stale.iter().map(|(_, t)| t.clone()).collect();
        match self.provider.embed(&texts).await {
            Ok(generated) => {
                for ((id, text), vector) in stale.into_iter().zip(generated) {
                    self.repo
                        .upsert_embedding(ref_type, id, text, &vector)
                        .await?;
                    vectors.insert(id, vector);
                }
            }
            Err(e) => {
                // Entities stay usable without a vector; scoring falls
                // back and a later run retries generation.
                warn!(
                    "Embedding generation failed for {} {} items: {}",
                    stale.len(),
                    ref_type.as_str(),
                    e
                );
            }
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repository;
    use crate::engine::testing::{FailingEmbedder, MockEmbedder};
    use crate::models::{NewArticle, NewInterest, NewSource};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<Repository>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let repo = Arc::new(Repository::new(path.to_str().unwrap()).await.unwrap());
        (dir, repo)
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.5, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_handles_degenerate_input() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let s = "héllo wörld";
        let truncated = truncate_to_char_boundary(s, 2);
        // byte 2 falls inside 'é'; back up to byte 1
        assert_eq!(truncated, "h");
        assert_eq!(truncate_to_char_boundary(s, 100), s);
        assert_eq!(truncate_to_char_boundary("日本語テキスト", 7), "日本");
    }

    #[tokio::test]
    async fn stored_vectors_reused_when_text_unchanged() {
        let (_dir, repo) = setup().await;
        let id = repo
            .insert_interest(NewInterest {
                user_id: 1,
                category: "Rust".to_string(),
                description: None,
                weight: 1.0,
            })
            .await
            .unwrap();
        let interests = repo.get_active_interests(1).await.unwrap();

        let store = EmbeddingStore::new(repo.clone(), Arc::new(MockEmbedder), 2000);
        let first = store.ensure_interest_embeddings(&interests).await.unwrap();
        assert_eq!(first.len(), 1);

        // Second pass with unchanged text must not need the provider.
        let store = EmbeddingStore::new(repo.clone(), Arc::new(FailingEmbedder), 2000);
        let second = store.ensure_interest_embeddings(&interests).await.unwrap();
        assert_eq!(second.get(&id), first.get(&id));
    }

    #[tokio::test]
    async fn provider_outage_yields_partial_map() {
        let (_dir, repo) = setup().await;
        let source_id = repo
            .insert_source(NewSource {
                user_id: 1,
                title: "Feed".to_string(),
                url: "https://example.com/feed".to_string(),
            })
            .await
            .unwrap();
        repo.insert_article(NewArticle {
            source_id,
            title: "Title".to_string(),
            url: "https://example.com/a/1".to_string(),
            content: Some("Body".to_string()),
        })
        .await
        .unwrap();
        let articles = repo.get_unscored_articles(1).await.unwrap();

        let store = EmbeddingStore::new(repo.clone(), Arc::new(FailingEmbedder), 2000);
        let vectors = store.ensure_article_embeddings(&articles).await.unwrap();
        assert!(vectors.is_empty());
    }
}
