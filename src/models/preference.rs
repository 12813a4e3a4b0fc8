use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A model-distilled natural-language statement about what the user
/// likes or dislikes. A cache of the feedback corpus, fully
/// regenerable, replaced wholesale on each learning pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPreference {
    pub id: i64,
    pub user_id: i64,
    pub statement: String,
    pub confidence: f64,
    pub derived_from: i64,
    pub created_at: DateTime<Utc>,
}
