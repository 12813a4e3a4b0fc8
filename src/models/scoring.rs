use serde::{Deserialize, Serialize};

/// Where a persisted score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrigin {
    /// Parsed from the model's JSON response.
    Model,
    /// Per-article fallback after a missing or malformed record.
    Fallback,
    /// Whole-batch fallback after provider failure.
    Degraded,
}

/// One article's scoring outcome, before the trust multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub article_id: i64,
    pub relevance_score: f64,
    pub relevance_reason: String,
    pub is_serendipity: bool,
}
