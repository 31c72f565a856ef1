use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown class label: {0}")]
    UnknownClass(String),

    #[error("Invalid detection #{index}: {reason}")]
    InvalidDetection { index: usize, reason: &'static str },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}
