use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DigestTier, FeedbackAction};

/// A content item, ingested once and shared across users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub content: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub source_id: i64,
    pub title: String,
    pub url: String,
    pub content: Option<String>,
}

/// Per-(user, article) relevance state. This is the central mutable
/// row the engine writes to: score, reason, serendipity flag, tier,
/// digest membership, feedback and archive flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserArticle {
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub relevance_score: Option<f64>,
    pub relevance_reason: Option<String>,
    pub is_serendipity: bool,
    pub digest_id: Option<i64>,
    pub digest_tier: Option<DigestTier>,
    pub sentiment: Option<FeedbackAction>,
    pub is_bookmarked: bool,
    pub is_archived: bool,
    pub scored_at: Option<DateTime<Utc>>,
}
