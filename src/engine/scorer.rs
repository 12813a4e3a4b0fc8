use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::Repository;
use crate::engine::{cosine_similarity, truncate_to_char_boundary};
use crate::error::{AppError, Result};
use crate::models::{
    Article, FeedbackSample, Interest, LearnedPreference, ScoreOrigin, ScoringResult,
};
use crate::providers::ScoringProvider;

const PROMPT_EXCERPT_BYTES: usize = 400;
const OUTPUT_TOKENS_BASE: u32 = 256;
const OUTPUT_TOKENS_PER_ARTICLE: u32 = 60;

/// Everything the scorer needs about the user, prepared once per run
/// and threaded through every batch.
pub struct ScoringContext<'a> {
    pub interests: &'a [Interest],
    pub interest_vectors: &'a HashMap<i64, Vec<f32>>,
    pub learned_preferences: &'a [LearnedPreference],
    pub recent_feedback: &'a [FeedbackSample],
    pub trust_factors: &'a HashMap<i64, f64>,
}

#[derive(Debug, Default)]
pub struct BatchStats {
    pub model_scored: usize,
    pub fallbacks: usize,
    pub degraded: bool,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.model_scored + self.fallbacks
    }
}

/// Cheap candidate score from embedding similarity alone: the best
/// clipped cosine against any active interest, damped by the interest
/// weight. This is computed before the model call so a provider
/// timeout never costs a second round of embedding work.
pub fn embedding_baseline(
    article_vector: Option<&Vec<f32>>,
    interests: &[Interest],
    interest_vectors: &HashMap<i64, Vec<f32>>,
) -> f64 {
    let Some(article_vector) = article_vector else {
        return 0.0;
    };
    interests
        .iter()
        .filter_map(|interest| {
            interest_vectors.get(&interest.id).map(|iv| {
                let sim = cosine_similarity(article_vector, iv).clamp(0.0, 1.0) as f64;
                sim * (0.5 + 0.5 * interest.weight)
            })
        })
        .fold(0.0, f64::max)
}

/// Compact recent-feedback digest for the prompt.
pub fn feedback_summary(samples: &[FeedbackSample]) -> String {
    if samples.is_empty() {
        return "No feedback yet.".to_string();
    }
    let liked: Vec<_> = samples
        .iter()
        .filter(|s| s.action == crate::models::FeedbackAction::Liked)
        .take(5)
        .collect();
    let disliked: Vec<_> = samples
        .iter()
        .filter(|s| s.action == crate::models::FeedbackAction::Disliked)
        .take(5)
        .collect();

    let mut out = format!("{} recent feedback events.", samples.len());
    if !liked.is_empty() {
        let titles: Vec<_> = liked.iter().map(|s| s.article_title.as_str()).collect();
        let _ = write!(out, " Liked: {}.", titles.join("; "));
    }
    if !disliked.is_empty() {
        let titles: Vec<_> = disliked.iter().map(|s| s.article_title.as_str()).collect();
        let _ = write!(out, " Disliked: {}.", titles.join("; "));
    }
    out
}

pub fn build_scoring_prompt(ctx: &ScoringContext<'_>, articles: &[Article]) -> String {
    let mut prompt = String::from(
        "You are ranking candidate articles for a personal news digest.\n\nUser interests (weight in parentheses):\n",
    );
    for interest in ctx.interests {
        match &interest.description {
            Some(desc) if !desc.is_empty() => {
                let _ = writeln!(
                    prompt,
                    "- {} ({:.2}): {}",
                    interest.category, interest.weight, desc
                );
            }
            _ => {
                let _ = writeln!(prompt, "- {} ({:.2})", interest.category, interest.weight);
            }
        }
    }

    prompt.push_str("\nLearned preferences:\n");
    if ctx.learned_preferences.is_empty() {
        prompt.push_str("None yet.\n");
    } else {
        for pref in ctx.learned_preferences {
            let _ = writeln!(prompt, "- {} (confidence {:.2})", pref.statement, pref.confidence);
        }
    }

    let _ = writeln!(prompt, "\nRecent feedback: {}", feedback_summary(ctx.recent_feedback));

    prompt.push_str("\nCandidate articles:\n");
    for article in articles {
        let _ = writeln!(prompt, "- id {}: {} ({})", article.id, article.title, article.url);
        if let Some(content) = &article.content {
            let excerpt = truncate_to_char_boundary(content, PROMPT_EXCERPT_BYTES);
            if !excerpt.is_empty() {
                let _ = writeln!(prompt, "  {}", excerpt.replace('\n', " "));
            }
        }
    }

    prompt.push_str(
        r#"
Score every article for this user. Respond with ONLY a JSON array, one object per article:
[{"article_id": 1, "relevance_score": 0.82, "relevance_reason": "Matches: <category>", "is_serendipity": false}]

Rules:
- relevance_score is a number from 0.0 to 1.0.
- relevance_reason is exactly "Matches: <category>" naming one of the interest categories above, or exactly "Serendipity".
- is_serendipity is true only for the rare article clearly outside the stated interests that is still worth surfacing; in the overwhelming majority of cases it is false, and it must be true when the reason is "Serendipity".
- Include every article id exactly once.
"#,
    );
    prompt
}

/// Decodes one record from the model's array. Any field outside the
/// allowed value set fails the record, which sends that article down
/// the fallback path instead of raising.
fn decode_record(value: &serde_json::Value, categories: &HashSet<&str>) -> Option<ScoringResult> {
    let obj = value.as_object()?;
    let article_id = obj.get("article_id")?.as_i64()?;
    let relevance_score = obj.get("relevance_score")?.as_f64()?;
    if !(0.0..=1.0).contains(&relevance_score) {
        return None;
    }
    let reason = obj.get("relevance_reason")?.as_str()?;
    let is_serendipity = obj.get("is_serendipity")?.as_bool()?;

    if reason == "Serendipity" {
        if !is_serendipity {
            return None;
        }
    } else if let Some(category) = reason.strip_prefix("Matches: ") {
        if is_serendipity || !categories.contains(category) {
            return None;
        }
    } else {
        return None;
    }

    Some(ScoringResult {
        article_id,
        relevance_score,
        relevance_reason: reason.to_string(),
        is_serendipity,
    })
}

/// Parses the model's response into results keyed by article id.
/// Individual malformed records are dropped (their articles fall
/// back); a response with no JSON array at all is a format error the
/// caller retries before degrading the whole batch.
pub fn parse_scoring_response(
    text: &str,
    categories: &HashSet<&str>,
) -> Result<HashMap<i64, ScoringResult>> {
    let start = text.find('[');
    let end = text.rfind(']');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AppError::ProviderFormat(
            "no JSON array in scoring response".to_string(),
        ));
    };
    if end < start {
        return Err(AppError::ProviderFormat(
            "no JSON array in scoring response".to_string(),
        ));
    }

    let values: Vec<serde_json::Value> = serde_json::from_str(&text[start..=end])
        .map_err(|e| AppError::ProviderFormat(format!("scoring response not a JSON array: {}", e)))?;

    let mut results = HashMap::new();
    for value in &values {
        match decode_record(value, categories) {
            Some(result) => {
                // first record wins on duplicate ids
                results.entry(result.article_id).or_insert(result);
            }
            None => warn!("Dropping malformed scoring record: {}", value),
        }
    }
    Ok(results)
}

/// Hybrid scorer: embedding similarity as the cheap signal and
/// fallback, a language-model judgment as the authoritative signal,
/// and the per-source trust multiplier applied last.
pub struct RelevanceScorer {
    repo: Arc<Repository>,
    provider: Arc<dyn ScoringProvider>,
    max_attempts: u32,
}

impl RelevanceScorer {
    pub fn new(repo: Arc<Repository>, provider: Arc<dyn ScoringProvider>, max_attempts: u32) -> Self {
        let max_attempts = max_attempts.max(1);
        Self {
            repo,
            provider,
            max_attempts,
        }
    }

    /// Asks the model for a scored batch, re-prompting when the reply
    /// has no usable JSON array. The provider handles transport-level
    /// retries itself, so a transport failure here has already spent
    /// its budget and degrades immediately.
    async fn request_scores(
        &self,
        prompt: &str,
        max_tokens: u32,
        categories: &HashSet<&str>,
    ) -> Option<HashMap<i64, ScoringResult>> {
        let mut attempt = 0;
        loop {
            match self.provider.complete(prompt, max_tokens).await {
                Ok(text) => match parse_scoring_response(&text, categories) {
                    Ok(results) => return Some(results),
                    Err(e) if attempt + 1 < self.max_attempts => {
                        let delay = std::time::Duration::from_millis(500 * 2u64.pow(attempt));
                        warn!(
                            "Scoring response malformed (attempt {}/{}), re-prompting in {:?}: {}",
                            attempt + 1,
                            self.max_attempts,
                            delay,
                            e
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        warn!(
                            "Scoring response unusable after {} attempts, degrading batch: {}",
                            self.max_attempts, e
                        );
                        return None;
                    }
                },
                Err(e) => {
                    warn!("Scoring provider failed, degrading batch: {}", e);
                    return None;
                }
            }
        }
    }

    pub async fn score_batch(
        &self,
        user_id: i64,
        ctx: &ScoringContext<'_>,
        articles: &[Article],
        article_vectors: &HashMap<i64, Vec<f32>>,
    ) -> Result<BatchStats> {
        if articles.is_empty() {
            return Ok(BatchStats::default());
        }

        // Fallback scores are cached before the model call.
        let baselines: HashMap<i64, f64> = articles
            .iter()
            .map(|a| {
                (
                    a.id,
                    embedding_baseline(article_vectors.get(&a.id), ctx.interests, ctx.interest_vectors),
                )
            })
            .collect();

        let categories: HashSet<&str> =
            ctx.interests.iter().map(|i| i.category.as_str()).collect();
        let prompt = build_scoring_prompt(ctx, articles);
        let max_tokens = OUTPUT_TOKENS_BASE + articles.len() as u32 * OUTPUT_TOKENS_PER_ARTICLE;

        let parsed = self.request_scores(&prompt, max_tokens, &categories).await;

        let mut stats = BatchStats {
            degraded: parsed.is_none(),
            ..BatchStats::default()
        };

        for article in articles {
            let baseline = baselines[&article.id];
            let (score, reason, is_serendipity, origin) =
                match parsed.as_ref().and_then(|m| m.get(&article.id)) {
                    Some(r) => (
                        r.relevance_score,
                        r.relevance_reason.clone(),
                        r.is_serendipity,
                        ScoreOrigin::Model,
                    ),
                    None if stats.degraded => (
                        baseline,
                        "Embedding fallback".to_string(),
                        false,
                        ScoreOrigin::Degraded,
                    ),
                    None => {
                        debug!(
                            "Article {} missing from model response, using embedding fallback",
                            article.id
                        );
                        (
                            baseline,
                            "Embedding fallback".to_string(),
                            false,
                            ScoreOrigin::Fallback,
                        )
                    }
                };

            let trust = ctx
                .trust_factors
                .get(&article.source_id)
                .copied()
                .unwrap_or(1.0);
            let final_score = (score * trust).clamp(0.0, 1.0);

            self.repo
                .save_score(user_id, article.id, final_score, reason, is_serendipity)
                .await?;

            match origin {
                ScoreOrigin::Model => stats.model_scored += 1,
                ScoreOrigin::Fallback | ScoreOrigin::Degraded => stats.fallbacks += 1,
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::MockScoring;
    use crate::error::AppError;
    use crate::models::{FeedbackAction, NewArticle, NewInterest, NewSource};
    use chrono::Utc;
    use tempfile::TempDir;

    fn interest(id: i64, category: &str, weight: f64) -> Interest {
        Interest {
            id,
            user_id: 1,
            category: category.to_string(),
            description: None,
            weight,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn categories(names: &[&'static str]) -> HashSet<&'static str> {
        names.iter().copied().collect()
    }

    #[test]
    fn parses_well_formed_response() {
        let text = r#"Here are the scores:
[{"article_id": 1, "relevance_score": 0.9, "relevance_reason": "Matches: Rust", "is_serendipity": false},
 {"article_id": 2, "relevance_score": 0.4, "relevance_reason": "Serendipity", "is_serendipity": true}]"#;
        let results = parse_scoring_response(text, &categories(&["Rust"])).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[&1].relevance_score, 0.9);
        assert!(results[&2].is_serendipity);
    }

    #[test]
    fn drops_records_with_unknown_category() {
        let text = r#"[{"article_id": 1, "relevance_score": 0.9, "relevance_reason": "Matches: Golf", "is_serendipity": false}]"#;
        let results = parse_scoring_response(text, &categories(&["Rust"])).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn drops_out_of_range_scores_and_flag_mismatches() {
        let text = r#"[
            {"article_id": 1, "relevance_score": 1.4, "relevance_reason": "Matches: Rust", "is_serendipity": false},
            {"article_id": 2, "relevance_score": 0.5, "relevance_reason": "Serendipity", "is_serendipity": false},
            {"article_id": 3, "relevance_score": 0.5, "relevance_reason": "Matches: Rust", "is_serendipity": true},
            {"article_id": 4, "relevance_score": 0.5, "relevance_reason": "Matches: Rust", "is_serendipity": false}
        ]"#;
        let results = parse_scoring_response(text, &categories(&["Rust"])).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.contains_key(&4));
    }

    #[test]
    fn whole_response_without_array_is_format_error() {
        let err = parse_scoring_response("I cannot score these articles.", &categories(&["Rust"]));
        assert!(matches!(err, Err(AppError::ProviderFormat(_))));
    }

    #[test]
    fn baseline_takes_best_weighted_interest() {
        let interests = vec![interest(1, "Rust", 1.0), interest(2, "Golf", 1.0)];
        let mut vectors = HashMap::new();
        vectors.insert(1, vec![1.0, 0.0]);
        vectors.insert(2, vec![0.0, 1.0]);

        let article = vec![1.0, 0.0];
        let score = embedding_baseline(Some(&article), &interests, &vectors);
        assert!((score - 1.0).abs() < 1e-6);

        // weight dampens the contribution
        let interests = vec![interest(1, "Rust", 0.1)];
        let score = embedding_baseline(Some(&article), &interests, &vectors);
        assert!((score - 0.55).abs() < 1e-6);
    }

    #[test]
    fn baseline_without_vector_is_zero() {
        let interests = vec![interest(1, "Rust", 1.0)];
        assert_eq!(embedding_baseline(None, &interests, &HashMap::new()), 0.0);
    }

    #[test]
    fn summary_mentions_liked_and_disliked_titles() {
        let samples = vec![
            FeedbackSample {
                action: FeedbackAction::Liked,
                article_title: "Borrow checker deep dive".to_string(),
                source_title: "Blog".to_string(),
                relevance_reason: None,
            },
            FeedbackSample {
                action: FeedbackAction::Disliked,
                article_title: "Token launch".to_string(),
                source_title: "News".to_string(),
                relevance_reason: None,
            },
        ];
        let summary = feedback_summary(&samples);
        assert!(summary.contains("Borrow checker deep dive"));
        assert!(summary.contains("Token launch"));
        assert_eq!(feedback_summary(&[]), "No feedback yet.");
    }

    async fn seed(repo: &Repository, article_count: usize) -> (i64, Vec<i64>) {
        let source_id = repo
            .insert_source(NewSource {
                user_id: 1,
                title: "Feed".to_string(),
                url: "https://example.com/feed".to_string(),
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for i in 0..article_count {
            ids.push(
                repo.insert_article(NewArticle {
                    source_id,
                    title: format!("Article {}", i),
                    url: format!("https://example.com/a/{}", i),
                    content: Some("Body".to_string()),
                })
                .await
                .unwrap(),
            );
        }
        (source_id, ids)
    }

    #[tokio::test]
    async fn model_scores_get_trust_multiplier_and_clamp() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(
            Repository::new(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        repo.insert_interest(NewInterest {
            user_id: 1,
            category: "Rust".to_string(),
            description: None,
            weight: 1.0,
        })
        .await
        .unwrap();
        let (source_id, ids) = seed(&repo, 2).await;
        let interests = repo.get_active_interests(1).await.unwrap();

        let response = format!(
            r#"[{{"article_id": {}, "relevance_score": 0.5, "relevance_reason": "Matches: Rust", "is_serendipity": false}},
                {{"article_id": {}, "relevance_score": 0.95, "relevance_reason": "Matches: Rust", "is_serendipity": false}}]"#,
            ids[0], ids[1]
        );
        let provider = Arc::new(MockScoring::new(vec![Ok(response)]));
        let scorer = RelevanceScorer::new(repo.clone(), provider, 2);

        let mut trust = HashMap::new();
        trust.insert(source_id, 1.2);
        let ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &HashMap::new(),
            learned_preferences: &[],
            recent_feedback: &[],
            trust_factors: &trust,
        };
        let articles = repo.get_unscored_articles(1).await.unwrap();
        let stats = scorer
            .score_batch(1, &ctx, &articles, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(stats.model_scored, 2);
        assert!(!stats.degraded);

        let first = repo.get_user_article(1, ids[0]).await.unwrap().unwrap();
        assert!((first.relevance_score.unwrap() - 0.6).abs() < 1e-9);

        // 0.95 * 1.2 clamps back to 1.0
        let second = repo.get_user_article(1, ids[1]).await.unwrap().unwrap();
        assert_eq!(second.relevance_score, Some(1.0));
    }

    #[tokio::test]
    async fn missing_record_falls_back_per_article() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(
            Repository::new(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        let interest_id = repo
            .insert_interest(NewInterest {
                user_id: 1,
                category: "Rust".to_string(),
                description: None,
                weight: 0.1,
            })
            .await
            .unwrap();
        let (_source_id, ids) = seed(&repo, 2).await;
        let interests = repo.get_active_interests(1).await.unwrap();

        let response = format!(
            r#"[{{"article_id": {}, "relevance_score": 0.9, "relevance_reason": "Matches: Rust", "is_serendipity": false}}]"#,
            ids[0]
        );
        let provider = Arc::new(MockScoring::new(vec![Ok(response)]));
        let scorer = RelevanceScorer::new(repo.clone(), provider, 2);

        // Article vectors identical to the interest vector: similarity
        // 1.0, weight 0.1 -> baseline 0.55.
        let mut interest_vectors = HashMap::new();
        interest_vectors.insert(interest_id, vec![1.0, 0.0]);
        let mut article_vectors = HashMap::new();
        article_vectors.insert(ids[0], vec![1.0, 0.0]);
        article_vectors.insert(ids[1], vec![1.0, 0.0]);

        let ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &interest_vectors,
            learned_preferences: &[],
            recent_feedback: &[],
            trust_factors: &HashMap::new(),
        };
        let articles = repo.get_unscored_articles(1).await.unwrap();
        let stats = scorer
            .score_batch(1, &ctx, &articles, &article_vectors)
            .await
            .unwrap();
        assert_eq!(stats.model_scored, 1);
        assert_eq!(stats.fallbacks, 1);
        assert!(!stats.degraded);

        let fell_back = repo.get_user_article(1, ids[1]).await.unwrap().unwrap();
        assert!((fell_back.relevance_score.unwrap() - 0.55).abs() < 1e-6);
        assert_eq!(fell_back.relevance_reason.as_deref(), Some("Embedding fallback"));
    }

    #[tokio::test]
    async fn provider_failure_degrades_whole_batch() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(
            Repository::new(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        let interest_id = repo
            .insert_interest(NewInterest {
                user_id: 1,
                category: "Rust".to_string(),
                description: None,
                weight: 0.1,
            })
            .await
            .unwrap();
        let (source_id, ids) = seed(&repo, 1).await;
        let interests = repo.get_active_interests(1).await.unwrap();

        let provider = Arc::new(MockScoring::failing());
        let scorer = RelevanceScorer::new(repo.clone(), provider, 2);

        let mut interest_vectors = HashMap::new();
        interest_vectors.insert(interest_id, vec![1.0, 0.0]);
        let mut article_vectors = HashMap::new();
        article_vectors.insert(ids[0], vec![1.0, 0.0]);
        let mut trust = HashMap::new();
        trust.insert(source_id, 1.12);

        let ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &interest_vectors,
            learned_preferences: &[],
            recent_feedback: &[],
            trust_factors: &trust,
        };
        let articles = repo.get_unscored_articles(1).await.unwrap();
        let stats = scorer
            .score_batch(1, &ctx, &articles, &article_vectors)
            .await
            .unwrap();
        assert!(stats.degraded);
        assert_eq!(stats.fallbacks, 1);

        // baseline 0.55 * trust 1.12 = 0.616
        let row = repo.get_user_article(1, ids[0]).await.unwrap().unwrap();
        assert!((row.relevance_score.unwrap() - 0.616).abs() < 1e-9);
    }

    #[tokio::test]
    async fn malformed_response_is_reprompted_before_degrading() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(
            Repository::new(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        repo.insert_interest(NewInterest {
            user_id: 1,
            category: "Rust".to_string(),
            description: None,
            weight: 1.0,
        })
        .await
        .unwrap();
        let (_source_id, ids) = seed(&repo, 1).await;
        let interests = repo.get_active_interests(1).await.unwrap();

        let good = format!(
            r#"[{{"article_id": {}, "relevance_score": 0.7, "relevance_reason": "Matches: Rust", "is_serendipity": false}}]"#,
            ids[0]
        );
        let provider = Arc::new(MockScoring::new(vec![
            Ok("I cannot score these articles.".to_string()),
            Ok(good),
        ]));
        let scorer = RelevanceScorer::new(repo.clone(), provider.clone(), 2);

        let ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &HashMap::new(),
            learned_preferences: &[],
            recent_feedback: &[],
            trust_factors: &HashMap::new(),
        };
        let articles = repo.get_unscored_articles(1).await.unwrap();
        let stats = scorer
            .score_batch(1, &ctx, &articles, &HashMap::new())
            .await
            .unwrap();

        // the garbage first reply costs one re-prompt, not the batch
        assert_eq!(provider.prompts.lock().unwrap().len(), 2);
        assert!(!stats.degraded);
        assert_eq!(stats.model_scored, 1);

        let row = repo.get_user_article(1, ids[0]).await.unwrap().unwrap();
        assert_eq!(row.relevance_score, Some(0.7));
        assert_eq!(row.relevance_reason.as_deref(), Some("Matches: Rust"));
    }

    #[tokio::test]
    async fn malformed_responses_exhaust_attempts_then_degrade() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(
            Repository::new(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        repo.insert_interest(NewInterest {
            user_id: 1,
            category: "Rust".to_string(),
            description: None,
            weight: 1.0,
        })
        .await
        .unwrap();
        let (_source_id, ids) = seed(&repo, 1).await;
        let interests = repo.get_active_interests(1).await.unwrap();

        let provider = Arc::new(MockScoring::new(vec![
            Ok("no array here".to_string()),
            Ok("still no array".to_string()),
        ]));
        let scorer = RelevanceScorer::new(repo.clone(), provider.clone(), 2);

        let ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &HashMap::new(),
            learned_preferences: &[],
            recent_feedback: &[],
            trust_factors: &HashMap::new(),
        };
        let articles = repo.get_unscored_articles(1).await.unwrap();
        let stats = scorer
            .score_batch(1, &ctx, &articles, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(provider.prompts.lock().unwrap().len(), 2);
        assert!(stats.degraded);
        assert_eq!(stats.fallbacks, 1);

        let row = repo.get_user_article(1, ids[0]).await.unwrap().unwrap();
        assert_eq!(row.relevance_reason.as_deref(), Some("Embedding fallback"));
    }

    #[test]
    fn prompt_includes_interests_preferences_and_rules() {
        let interests = vec![interest(1, "Rust", 0.9)];
        let prefs = vec![crate::models::LearnedPreference {
            id: 1,
            user_id: 1,
            statement: "Prefers deep technical writeups".to_string(),
            confidence: 0.8,
            derived_from: 40,
            created_at: Utc::now(),
        }];
        let articles = vec![Article {
            id: 7,
            source_id: 1,
            title: "Async cancellation".to_string(),
            url: "https://example.com/a/7".to_string(),
            content: Some("Long body".to_string()),
            discovered_at: Utc::now(),
        }];
        let ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &HashMap::new(),
            learned_preferences: &prefs,
            recent_feedback: &[],
            trust_factors: &HashMap::new(),
        };
        let prompt = build_scoring_prompt(&ctx, &articles);
        assert!(prompt.contains("Rust (0.90)"));
        assert!(prompt.contains("Prefers deep technical writeups"));
        assert!(prompt.contains("id 7: Async cancellation"));
        assert!(prompt.contains("\"Serendipity\""));

        let empty_ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &HashMap::new(),
            learned_preferences: &[],
            recent_feedback: &[],
            trust_factors: &HashMap::new(),
        };
        assert!(build_scoring_prompt(&empty_ctx, &articles).contains("None yet."));
    }
}
