use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Trade error {string_code} ({numeric_code}): {message}")]
    Trade {
        numeric_code: i64,
        string_code: String,
        message: String,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Transport-layer failure with a free-form reason.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    /// True when the error came from the transport layer, which retry loops
    /// absorb instead of surfacing.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
