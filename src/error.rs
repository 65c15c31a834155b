use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("GitHub API rate limit exceeded ({endpoint})")]
    RateLimited { endpoint: String },

    #[error("GitHub returned no data for {operation}")]
    MissingData { operation: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request limiter closed")]
    LimiterClosed,
}

impl StatsError {
    /// Rate limiting aborts the whole run; every other error is local to its call site.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
