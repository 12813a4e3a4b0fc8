use std::sync::Arc;

use tracing::debug;

use crate::db::Repository;
use crate::error::Result;
use crate::models::SourceFeedbackCounts;

#[derive(Debug, Clone, Copy)]
pub struct TrustPolicy {
    pub trust_min: f64,
    pub trust_max: f64,
    pub window_days: u32,
    pub min_samples: u32,
}

/// Maps windowed feedback sentiment onto the trust range. Below the
/// sample floor the factor stays neutral so a single early dislike
/// cannot sink a new source.
pub fn compute_trust_factor(counts: &SourceFeedbackCounts, policy: &TrustPolicy) -> (f64, i64) {
    let total = counts.total();
    if total < policy.min_samples as i64 {
        return (1.0, total);
    }
    let sentiment = (counts.liked - counts.disliked) as f64 / total as f64;
    let midpoint = (policy.trust_min + policy.trust_max) / 2.0;
    let range = policy.trust_max - policy.trust_min;
    let factor = (midpoint + sentiment * range / 2.0).clamp(policy.trust_min, policy.trust_max);
    (factor, total)
}

/// Recomputes the per-(user, source) trust multiplier from feedback
/// over the trailing window.
pub struct SourceTrustEngine {
    repo: Arc<Repository>,
    policy: TrustPolicy,
}

impl SourceTrustEngine {
    pub fn new(repo: Arc<Repository>, policy: TrustPolicy) -> Self {
        Self { repo, policy }
    }

    /// Returns the number of sources updated (every enabled source
    /// gets a row, neutral when feedback is sparse).
    pub async fn recompute(&self, user_id: i64) -> Result<usize> {
        let sources = self.repo.get_enabled_sources(user_id).await?;
        let counts = self
            .repo
            .source_feedback_counts(user_id, self.policy.window_days)
            .await?;

        let mut updated = 0;
        for source in &sources {
            let empty = SourceFeedbackCounts {
                source_id: source.id,
                liked: 0,
                neutral: 0,
                disliked: 0,
            };
            let source_counts = counts.get(&source.id).unwrap_or(&empty);
            let (factor, sample_size) = compute_trust_factor(source_counts, &self.policy);
            self.repo
                .upsert_source_trust(user_id, source.id, factor, sample_size)
                .await?;
            debug!(
                "Source {} trust {:.3} from {} samples",
                source.id, factor, sample_size
            );
            updated += 1;
        }
        Ok(updated)
    }
}
