use thiserror::Error;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum RateHubError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP status {0} from {1}")]
    HttpStatus(u16, String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    #[error("Failed to read history store: {0}")]
    StoreReadError(String),

    #[error("Failed to write history store {}: {source}", path.display())]
    StoreWriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, RateHubError>;

// 用于从字符串创建错误
impl From<String> for RateHubError {
    fn from(s: String) -> Self {
        RateHubError::Unknown(s)
    }
}

impl From<&str> for RateHubError {
    fn from(s: &str) -> Self {
        RateHubError::Unknown(s.to_string())
    }
}
