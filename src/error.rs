use thiserror::Error;

/// Failure taxonomy for the whole pipeline. Transport-level variants are
/// consumed by the retry wrapper; orchestration code only ever sees
/// `RetriesExhausted`, `Api`, `Decode`, `Validation` and `Archive`.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("retries exhausted after {attempts} attempts: {context}")]
    RetriesExhausted { attempts: u32, context: String },

    #[error("bilibili api error (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("malformed api response: {0}")]
    Decode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Short class name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::RetriesExhausted { .. } => "retries-exhausted",
            Self::Api { .. } => "api",
            Self::Decode(_) => "decode",
            Self::Validation(_) => "validation",
            Self::Archive(_) => "archive",
            Self::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for DownloadError {
    fn from(err: url::ParseError) -> Self {
        Self::Transport(format!("invalid url: {err}"))
    }
}
