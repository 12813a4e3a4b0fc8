use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub anthropic_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,

    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    // Source trust
    #[serde(default = "default_trust_min")]
    pub trust_min: f64,
    #[serde(default = "default_trust_max")]
    pub trust_max: f64,
    #[serde(default = "default_trust_window_days")]
    pub trust_window_days: u32,
    #[serde(default = "default_trust_min_samples")]
    pub trust_min_samples: u32,

    // Exclusions
    #[serde(default = "default_exclusion_veto_threshold")]
    pub exclusion_veto_threshold: f64,
    #[serde(default = "default_exclusion_cap")]
    pub exclusion_cap: usize,

    // Digest tiering
    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f64,
    #[serde(default = "default_bonus_floor")]
    pub bonus_floor: f64,

    // Scoring
    #[serde(default = "default_scoring_batch_size")]
    pub scoring_batch_size: usize,
    #[serde(default = "default_article_excerpt_bytes")]
    pub article_excerpt_bytes: usize,
    #[serde(default = "default_provider_max_retries")]
    pub provider_max_retries: u32,
    #[serde(default = "default_run_budget_secs")]
    pub run_budget_secs: u64,

    // Preference learning
    #[serde(default = "default_learn_min_feedback")]
    pub learn_min_feedback: u32,
    #[serde(default = "default_learn_force_min_feedback")]
    pub learn_force_min_feedback: u32,
    #[serde(default = "default_learn_window")]
    pub learn_window: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("curator");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("curator.db").to_string_lossy().to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_trust_min() -> f64 {
    0.8
}

fn default_trust_max() -> f64 {
    1.2
}

fn default_trust_window_days() -> u32 {
    60
}

fn default_trust_min_samples() -> u32 {
    5
}

fn default_exclusion_veto_threshold() -> f64 {
    0.8
}

fn default_exclusion_cap() -> usize {
    20
}

fn default_min_relevance_score() -> f64 {
    0.6
}

fn default_bonus_floor() -> f64 {
    0.3
}

fn default_scoring_batch_size() -> usize {
    40
}

fn default_article_excerpt_bytes() -> usize {
    2000
}

fn default_provider_max_retries() -> u32 {
    3
}

fn default_run_budget_secs() -> u64 {
    300
}

fn default_learn_min_feedback() -> u32 {
    50
}

fn default_learn_force_min_feedback() -> u32 {
    10
}

fn default_learn_window() -> usize {
    200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            anthropic_api_key: None,
            model: default_model(),
            embedding_api_url: None,
            embedding_api_key: None,
            embedding_model: default_embedding_model(),
            trust_min: default_trust_min(),
            trust_max: default_trust_max(),
            trust_window_days: default_trust_window_days(),
            trust_min_samples: default_trust_min_samples(),
            exclusion_veto_threshold: default_exclusion_veto_threshold(),
            exclusion_cap: default_exclusion_cap(),
            min_relevance_score: default_min_relevance_score(),
            bonus_floor: default_bonus_floor(),
            scoring_batch_size: default_scoring_batch_size(),
            article_excerpt_bytes: default_article_excerpt_bytes(),
            provider_max_retries: default_provider_max_retries(),
            run_budget_secs: default_run_budget_secs(),
            learn_min_feedback: default_learn_min_feedback(),
            learn_force_min_feedback: default_learn_force_min_feedback(),
            learn_window: default_learn_window(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("curator")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.trust_min > self.trust_max {
            return Err(AppError::Config(format!(
                "trust_min ({}) must not exceed trust_max ({})",
                self.trust_min, self.trust_max
            )));
        }
        if self.bonus_floor > self.min_relevance_score {
            return Err(AppError::Config(format!(
                "bonus_floor ({}) must not exceed min_relevance_score ({})",
                self.bonus_floor, self.min_relevance_score
            )));
        }
        if self.scoring_batch_size == 0 {
            return Err(AppError::Config(
                "scoring_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
