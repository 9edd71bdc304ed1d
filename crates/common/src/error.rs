use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error aborts the whole run. Row-level parse problems and
    /// notifier failures are absorbed by the run and only counted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Parse(_) | Error::Notification(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
