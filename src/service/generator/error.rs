use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Generator returned no images")]
    EmptyResult,
    #[error("Generation task failed: {0}")]
    Task(String),
}

impl GeneratorError {
    /// Whether another attempt may succeed: timeouts, transport failures, rate limits and
    /// server errors. Rejected prompts and empty results are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeneratorError::Timeout(_) => true,
            GeneratorError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            GeneratorError::Api { status, .. } => *status == 429 || *status >= 500,
            GeneratorError::EmptyResult | GeneratorError::Task(_) => false,
        }
    }
}
