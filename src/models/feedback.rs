use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    Liked,
    Neutral,
    Disliked,
}

impl FeedbackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackAction::Liked => "liked",
            FeedbackAction::Neutral => "neutral",
            FeedbackAction::Disliked => "disliked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "liked" => Some(FeedbackAction::Liked),
            "neutral" => Some(FeedbackAction::Neutral),
            "disliked" => Some(FeedbackAction::Disliked),
            _ => None,
        }
    }
}

/// Windowed per-source feedback tallies, the input to trust recompute.
#[derive(Debug, Clone)]
pub struct SourceFeedbackCounts {
    pub source_id: i64,
    pub liked: i64,
    pub neutral: i64,
    pub disliked: i64,
}

impl SourceFeedbackCounts {
    pub fn total(&self) -> i64 {
        self.liked + self.neutral + self.disliked
    }
}

/// Bounded multiplier applied to a source's articles at score time.
/// Neutral (1.0) until enough feedback samples exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTrust {
    pub id: i64,
    pub user_id: i64,
    pub source_id: i64,
    pub factor: f64,
    pub sample_size: i64,
    pub computed_at: DateTime<Utc>,
}

/// One feedback event joined with article metadata, as consumed by the
/// preference learner's summarization prompt.
#[derive(Debug, Clone)]
pub struct FeedbackSample {
    pub action: FeedbackAction,
    pub article_title: String,
    pub source_title: String,
    pub relevance_reason: Option<String>,
}
