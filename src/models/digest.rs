use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable snapshot of scored articles presented to the user.
/// The article set is fixed at creation; members may later be archived
/// but are only detached by an explicit reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub id: i64,
    pub user_id: i64,
    pub provider: String,
    pub article_count: i64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestTier {
    Recommended,
    Serendipity,
    Bonus,
}

impl DigestTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestTier::Recommended => "recommended",
            DigestTier::Serendipity => "serendipity",
            DigestTier::Bonus => "bonus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recommended" => Some(DigestTier::Recommended),
            "serendipity" => Some(DigestTier::Serendipity),
            "bonus" => Some(DigestTier::Bonus),
            _ => None,
        }
    }
}
