use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A positive topical preference. Weight in [0,1] controls prompt
/// emphasis; inactive interests are skipped entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub description: Option<String>,
    pub weight: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInterest {
    pub user_id: i64,
    pub category: String,
    pub description: Option<String>,
    pub weight: f64,
}

/// A negative topical filter. Never used for positive scoring, only to
/// veto articles whose embedding lands too close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExclusion {
    pub user_id: i64,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub url: String,
    pub is_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct NewSource {
    pub user_id: i64,
    pub title: String,
    pub url: String,
}
