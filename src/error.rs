use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider returned malformed response: {0}")]
    ProviderFormat(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    /// Provider failures, including malformed responses, are retried
    /// and then degraded to fallback scoring; everything else
    /// propagates.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Provider(_) | AppError::ProviderFormat(_) | AppError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
