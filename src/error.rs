use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Resource not found")]
    NotFound,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    #[error("Unsupported form: {0}")]
    UnsupportedForm(String),

    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "Unexpected content type from URL {url}. Expected pattern {expected_pattern}, but got Content-Type: {got_content_type}. Content preview: {content_preview}..."
    )]
    UnexpectedContentType {
        url: String,
        expected_pattern: String,
        got_content_type: String,
        content_preview: String,
    },
}

impl EdgarError {
    /// True for failures of shared setup (identification header missing, placeholder
    /// or rejected by the regulator). These abort a batch instead of a single filing.
    pub fn is_config(&self) -> bool {
        matches!(self, EdgarError::ConfigError(_))
    }

    /// True for network, timeout and HTTP status failures while retrieving a document.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            EdgarError::RequestError(_)
                | EdgarError::FetchError(_)
                | EdgarError::NotFound
                | EdgarError::RateLimitExceeded
                | EdgarError::InvalidResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EdgarError>;
