use thiserror::Error;

/// Failure of a single ERP query. Display yields the text surfaced to the
/// caller inside the `{"error": ...}` element.
#[derive(Debug, Error)]
pub enum ErpError {
    /// Non-200 reply; `body` is the raw response text.
    #[error("{body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid ERP url: {0}")]
    InvalidUrl(String),
}

impl ErpError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ErpError::Status { .. } => "status",
            ErpError::Transport(_) => "transport",
            ErpError::Decode(_) => "decode",
            ErpError::InvalidUrl(_) => "invalid_url",
        }
    }
}
