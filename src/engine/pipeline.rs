use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Repository;
use crate::engine::{
    veto_match, DigestAssembler, EmbeddingStore, LearnerConfig, PreferenceLearner,
    RelevanceScorer, ScoringContext, SourceTrustEngine, TierPolicy, TrustPolicy,
};
use crate::error::Result;
use crate::models::Exclusion;
use crate::providers::{EmbeddingProvider, ScoringProvider};

const FEEDBACK_SUMMARY_WINDOW: usize = 20;

/// Outcome of one pipeline run. Partial completion (budget exhausted)
/// is a valid terminal state; everything scored so far is persisted.
#[derive(Debug)]
pub struct RunSummary {
    pub user_id: i64,
    pub sources_updated: usize,
    pub scored: usize,
    pub model_scored: usize,
    pub fallbacks: usize,
    pub excluded: usize,
    pub degraded_batches: usize,
    pub digest_id: Option<i64>,
    pub partial: bool,
    pub elapsed: Duration,
}

/// Per-user batch pipeline: trust recompute, embedding upkeep,
/// exclusion filtering, hybrid scoring, digest assembly. Runs for the
/// same user are serialized; independent users may run in parallel.
pub struct Pipeline {
    repo: Arc<Repository>,
    store: EmbeddingStore,
    trust: SourceTrustEngine,
    scorer: RelevanceScorer,
    assembler: DigestAssembler,
    learner: PreferenceLearner,
    batch_size: usize,
    budget: Duration,
    veto_threshold: f64,
    run_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        repo: Arc<Repository>,
        scoring: Arc<dyn ScoringProvider>,
        embedding: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let store = EmbeddingStore::new(repo.clone(), embedding, config.article_excerpt_bytes);
        let trust = SourceTrustEngine::new(
            repo.clone(),
            TrustPolicy {
                trust_min: config.trust_min,
                trust_max: config.trust_max,
                window_days: config.trust_window_days,
                min_samples: config.trust_min_samples,
            },
        );
        let scorer = RelevanceScorer::new(repo.clone(), scoring.clone(), config.provider_max_retries);
        let assembler = DigestAssembler::new(
            repo.clone(),
            TierPolicy {
                min_relevance_score: config.min_relevance_score,
                bonus_floor: config.bonus_floor,
            },
        );
        let learner = PreferenceLearner::new(
            repo.clone(),
            scoring,
            LearnerConfig {
                min_feedback: config.learn_min_feedback,
                force_min_feedback: config.learn_force_min_feedback,
                window: config.learn_window,
            },
        );
        Self {
            repo,
            store,
            trust,
            scorer,
            assembler,
            learner,
            batch_size: config.scoring_batch_size,
            budget: Duration::from_secs(config.run_budget_secs),
            veto_threshold: config.exclusion_veto_threshold,
            run_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.run_locks.lock().await;
        locks.entry(user_id).or_default().clone()
    }

    /// Scores unassigned articles and assembles a digest. Safe to
    /// re-invoke: with nothing new to score it changes nothing.
    pub async fn run(&self, user_id: i64, provider_label: &str) -> Result<RunSummary> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        let started = Instant::now();

        // Trust is recomputed up front so every score in this run uses
        // factors derived from all feedback available at run start.
        let sources_updated = self.trust.recompute(user_id).await?;

        let mut summary = RunSummary {
            user_id,
            sources_updated,
            scored: 0,
            model_scored: 0,
            fallbacks: 0,
            excluded: 0,
            degraded_batches: 0,
            digest_id: None,
            partial: false,
            elapsed: Duration::ZERO,
        };

        let interests = self.repo.get_active_interests(user_id).await?;
        if interests.is_empty() {
            warn!("User {} has no active interests, nothing to score", user_id);
            summary.elapsed = started.elapsed();
            return Ok(summary);
        }
        let exclusions = self.repo.get_active_exclusions(user_id).await?;

        let interest_vectors = self.store.ensure_interest_embeddings(&interests).await?;
        let exclusion_vectors = self.store.ensure_exclusion_embeddings(&exclusions).await?;
        let exclusion_pairs = exclusion_filter_pairs(&exclusions, &exclusion_vectors);

        let learned_preferences = self.repo.get_learned_preferences(user_id).await?;
        let recent_feedback = self
            .repo
            .recent_feedback(user_id, FEEDBACK_SUMMARY_WINDOW)
            .await?;
        let trust_factors = self.repo.get_trust_factors(user_id).await?;

        let ctx = ScoringContext {
            interests: &interests,
            interest_vectors: &interest_vectors,
            learned_preferences: &learned_preferences,
            recent_feedback: &recent_feedback,
            trust_factors: &trust_factors,
        };

        let articles = self.repo.get_unscored_articles(user_id).await?;
        info!(
            "Scoring run for user {}: {} candidate articles",
            user_id,
            articles.len()
        );

        for batch in articles.chunks(self.batch_size) {
            if started.elapsed() >= self.budget {
                warn!(
                    "Run budget exhausted for user {} after {} articles, stopping cleanly",
                    user_id, summary.scored
                );
                summary.partial = true;
                break;
            }

            let article_vectors = self.store.ensure_article_embeddings(batch).await?;

            let mut to_score = Vec::new();
            for article in batch {
                let vetoed = article_vectors.get(&article.id).and_then(|vector| {
                    veto_match(vector, &exclusion_pairs, self.veto_threshold)
                        .map(str::to_string)
                });
                match vetoed {
                    Some(category) => {
                        self.repo
                            .mark_excluded(user_id, article.id, category)
                            .await?;
                        summary.excluded += 1;
                    }
                    None => to_score.push(article.clone()),
                }
            }
            if to_score.is_empty() {
                continue;
            }

            let stats = self
                .scorer
                .score_batch(user_id, &ctx, &to_score, &article_vectors)
                .await?;
            summary.scored += stats.total();
            summary.model_scored += stats.model_scored;
            summary.fallbacks += stats.fallbacks;
            if stats.degraded {
                summary.degraded_batches += 1;
            }
        }

        if summary.scored > 0 {
            summary.digest_id = self
                .assembler
                .assemble(user_id, provider_label)
                .await?
                .map(|d| d.id);
        }

        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    /// Preference learning entry point, serialized against scoring
    /// runs for the same user.
    pub async fn learn(&self, user_id: i64, force: bool) -> Result<bool> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        self.learner.learn(user_id, force).await
    }

}

fn exclusion_filter_pairs(
    exclusions: &[Exclusion],
    vectors: &HashMap<i64, Vec<f32>>,
) -> Vec<(String, Vec<f32>)> {
    exclusions
        .iter()
        .filter_map(|e| {
            vectors
                .get(&e.id)
                .map(|v| (e.category.clone(), v.clone()))
        })
        .collect()
}
