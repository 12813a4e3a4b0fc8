use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Interest,
    Exclusion,
    Article,
}

impl RefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefType::Interest => "interest",
            RefType::Exclusion => "exclusion",
            RefType::Article => "article",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "interest" => Some(RefType::Interest),
            "exclusion" => Some(RefType::Exclusion),
            "article" => Some(RefType::Article),
            _ => None,
        }
    }
}

/// A stored vector, at most one per (ref_type, ref_id). `source_text`
/// is the exact text that produced the vector, kept so regeneration
/// can be skipped when the text is unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct Embedding {
    pub id: i64,
    pub ref_type: RefType,
    pub ref_id: i64,
    pub source_text: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}
