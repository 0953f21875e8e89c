use thiserror::Error;

#[derive(Debug, Error)]
pub enum RslFetchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RslFetchError>;
