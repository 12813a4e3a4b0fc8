use std::sync::Arc;

use tracing::info;

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Digest, DigestTier};

#[derive(Debug, Clone, Copy)]
pub struct TierPolicy {
    pub min_relevance_score: f64,
    pub bonus_floor: f64,
}

/// Buckets one scored candidate. Serendipity always makes the digest
/// regardless of score; everything below the bonus floor stays
/// unassigned and eligible for a later run.
pub fn tier_for(score: f64, is_serendipity: bool, policy: &TierPolicy) -> Option<DigestTier> {
    if is_serendipity {
        return Some(DigestTier::Serendipity);
    }
    if score >= policy.min_relevance_score {
        return Some(DigestTier::Recommended);
    }
    if score >= policy.bonus_floor {
        return Some(DigestTier::Bonus);
    }
    None
}

/// Assembles scored, unassigned articles into an immutable digest
/// snapshot.
pub struct DigestAssembler {
    repo: Arc<Repository>,
    policy: TierPolicy,
}

impl DigestAssembler {
    pub fn new(repo: Arc<Repository>, policy: TierPolicy) -> Self {
        Self { repo, policy }
    }

    /// No candidates, or none above the bonus floor, is an idempotent
    /// no-op: no digest row is created.
    pub async fn assemble(&self, user_id: i64, provider_label: &str) -> Result<Option<Digest>> {
        let candidates = self.repo.get_digest_candidates(user_id).await?;
        if candidates.is_empty() {
            return Ok(None);
        }

        let mut assignments = Vec::new();
        for candidate in &candidates {
            let score = candidate.relevance_score.unwrap_or(0.0);
            if let Some(tier) = tier_for(score, candidate.is_serendipity, &self.policy) {
                assignments.push((candidate.id, tier));
            }
        }
        if assignments.is_empty() {
            return Ok(None);
        }

        let count = assignments.len();
        let digest_id = self
            .repo
            .create_digest(user_id, provider_label.to_string(), assignments)
            .await?;
        info!(
            "Assembled digest {} for user {}: {} of {} candidates",
            digest_id,
            user_id,
            count,
            candidates.len()
        );
        self.repo.get_digest(digest_id).await
    }
}
