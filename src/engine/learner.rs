use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{info, warn};

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::FeedbackSample;
use crate::providers::ScoringProvider;

const LEARN_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy)]
pub struct LearnerConfig {
    pub min_feedback: u32,
    pub force_min_feedback: u32,
    pub window: usize,
}

/// Distills accumulated feedback into natural-language preference
/// statements that future scoring prompts carry. Runs on its own
/// cadence, never touches scores directly.
pub struct PreferenceLearner {
    repo: Arc<Repository>,
    provider: Arc<dyn ScoringProvider>,
    config: LearnerConfig,
}

fn build_learning_prompt(samples: &[FeedbackSample]) -> String {
    let mut prompt = String::from(
        "You are distilling a reader's feedback history into durable preference statements.\n\nFeedback events (most recent first):\n",
    );
    for sample in samples {
        let reason = sample.relevance_reason.as_deref().unwrap_or("unscored");
        let _ = writeln!(
            prompt,
            "- {} \"{}\" from {} (was: {})",
            sample.action.as_str(),
            sample.article_title,
            sample.source_title,
            reason
        );
    }
    prompt.push_str(
        r#"
Summarize the patterns as 3 to 6 preference statements. Respond with ONLY a JSON array:
[{"statement": "Prefers hands-on systems programming content over industry news", "confidence": 0.8, "derived_from": 24}]

Rules:
- statement is one natural-language sentence about what the reader wants more or less of.
- confidence is a number from 0.0 to 1.0.
- derived_from is the count of feedback events supporting the statement.
"#,
    );
    prompt
}

/// Statements with a confidence outside [0,1] are clamped rather than
/// dropped; structurally broken records fail the whole distillation
/// (it is regenerated next cycle anyway).
fn parse_preferences(text: &str) -> Result<Vec<(String, f64, i64)>> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(AppError::ProviderFormat(
            "no JSON array in learning response".to_string(),
        ));
    };
    if end < start {
        return Err(AppError::ProviderFormat(
            "no JSON array in learning response".to_string(),
        ));
    }

    #[derive(serde::Deserialize)]
    struct RawPreference {
        statement: String,
        confidence: f64,
        #[serde(default)]
        derived_from: i64,
    }

    let raw: Vec<RawPreference> = serde_json::from_str(&text[start..=end])
        .map_err(|e| AppError::ProviderFormat(format!("learning response not valid: {}", e)))?;

    Ok(raw
        .into_iter()
        .filter(|p| !p.statement.trim().is_empty())
        .map(|p| {
            (
                p.statement,
                p.confidence.clamp(0.0, 1.0),
                p.derived_from.max(0),
            )
        })
        .collect())
}

impl PreferenceLearner {
    pub fn new(
        repo: Arc<Repository>,
        provider: Arc<dyn ScoringProvider>,
        config: LearnerConfig,
    ) -> Self {
        Self {
            repo,
            provider,
            config,
        }
    }

    /// Returns true when preferences were replaced. Below the feedback
    /// gate, or on any provider problem, returns false and leaves
    /// prior preferences untouched.
    pub async fn learn(&self, user_id: i64, force: bool) -> Result<bool> {
        let gate = if force {
            self.config.force_min_feedback
        } else {
            self.config.min_feedback
        };
        let total = self.repo.count_feedback(user_id).await?;
        if total < gate as i64 {
            info!(
                "Skipping preference learning for user {}: {} feedback events, gate {}",
                user_id, total, gate
            );
            return Ok(false);
        }

        let samples = self.repo.recent_feedback(user_id, self.config.window).await?;
        let prompt = build_learning_prompt(&samples);

        let text = match self.provider.complete(&prompt, LEARN_MAX_TOKENS).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Preference learning provider call failed: {}", e);
                return Ok(false);
            }
        };
        let preferences = match parse_preferences(&text) {
            Ok(prefs) if !prefs.is_empty() => prefs,
            Ok(_) => {
                warn!("Preference learning produced no statements, keeping prior set");
                return Ok(false);
            }
            Err(e) => {
                warn!("Preference learning response unusable: {}", e);
                return Ok(false);
            }
        };

        let count = preferences.len();
        self.repo
            .replace_learned_preferences(user_id, preferences)
            .await?;
        info!(
            "Learned {} preferences for user {} from {} feedback events",
            count, user_id, total
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::MockScoring;
    use crate::models::{FeedbackAction, NewArticle, NewSource};
    use tempfile::TempDir;

    const CONFIG: LearnerConfig = LearnerConfig {
        min_feedback: 50,
        force_min_feedback: 10,
        window: 200,
    };

    async fn repo_with_feedback(events: usize) -> (TempDir, Arc<Repository>) {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(
            Repository::new(dir.path().join("t.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        let source_id = repo
            .insert_source(NewSource {
                user_id: 1,
                title: "Feed".to_string(),
                url: "https://example.com/feed".to_string(),
            })
            .await
            .unwrap();
        let article_id = repo
            .insert_article(NewArticle {
                source_id,
                title: "Article".to_string(),
                url: "https://example.com/a/1".to_string(),
                content: None,
            })
            .await
            .unwrap();
        for i in 0..events {
            let action = if i % 3 == 0 {
                FeedbackAction::Disliked
            } else {
                FeedbackAction::Liked
            };
            repo.record_feedback(1, article_id, action).await.unwrap();
        }
        (dir, repo)
    }

    const RESPONSE: &str = r#"[{"statement": "Likes compiler internals", "confidence": 0.9, "derived_from": 30},
        {"statement": "Skips funding news", "confidence": 1.7, "derived_from": 12}]"#;

    #[tokio::test]
    async fn below_gate_skips_without_writes() {
        let (_dir, repo) = repo_with_feedback(45).await;
        let provider = Arc::new(MockScoring::new(vec![Ok(RESPONSE.to_string())]));
        let learner = PreferenceLearner::new(repo.clone(), provider.clone(), CONFIG);

        assert!(!learner.learn(1, false).await.unwrap());
        assert!(repo.get_learned_preferences(1).await.unwrap().is_empty());
        // gate failed before any prompt was sent
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn above_gate_replaces_preferences() {
        let (_dir, repo) = repo_with_feedback(52).await;
        repo.replace_learned_preferences(1, vec![("Old statement".to_string(), 0.5, 10)])
            .await
            .unwrap();
        let provider = Arc::new(MockScoring::new(vec![Ok(RESPONSE.to_string())]));
        let learner = PreferenceLearner::new(repo.clone(), provider, CONFIG);

        assert!(learner.learn(1, false).await.unwrap());
        let prefs = repo.get_learned_preferences(1).await.unwrap();
        assert_eq!(prefs.len(), 2);
        assert!(prefs.iter().all(|p| p.statement != "Old statement"));
        // out-of-range confidence clamped
        assert!(prefs.iter().all(|p| (0.0..=1.0).contains(&p.confidence)));
    }

    #[tokio::test]
    async fn force_lowers_the_gate() {
        let (_dir, repo) = repo_with_feedback(12).await;
        let provider = Arc::new(MockScoring::new(vec![Ok(RESPONSE.to_string())]));
        let learner = PreferenceLearner::new(repo.clone(), provider, CONFIG);

        assert!(!learner.learn(1, false).await.unwrap());
        assert!(learner.learn(1, true).await.unwrap());
    }

    #[tokio::test]
    async fn provider_failure_keeps_prior_preferences() {
        let (_dir, repo) = repo_with_feedback(60).await;
        repo.replace_learned_preferences(1, vec![("Kept".to_string(), 0.6, 20)])
            .await
            .unwrap();
        let learner =
            PreferenceLearner::new(repo.clone(), Arc::new(MockScoring::failing()), CONFIG);

        assert!(!learner.learn(1, false).await.unwrap());
        let prefs = repo.get_learned_preferences(1).await.unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs[0].statement, "Kept");
    }

    #[test]
    fn unparseable_response_is_format_error() {
        assert!(parse_preferences("no structure here").is_err());
        assert!(parse_preferences("[{\"bogus\": 1}]").is_err());
    }
}
