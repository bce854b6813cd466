use thiserror::Error;

/// Errors raised while crawling a listing or writing the product document
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The listing's search control never appeared within the wait bound
    #[error("search control `{selector}` not found on {url}")]
    Navigation { url: String, selector: String },

    /// WebDriver connection or command failure
    #[error("webdriver error: {0}")]
    Driver(String),

    /// A configured CSS selector does not parse
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    /// Configuration could not be read or decoded
    #[error("configuration error: {0}")]
    Config(String),

    /// Image retrieval failed
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The document could not be composed or persisted
    #[error("failed to write document {path}: {reason}")]
    DocumentWrite { path: String, reason: String },
}

impl From<fantoccini::error::CmdError> for ScrapeError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        ScrapeError::Driver(err.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for ScrapeError {
    fn from(err: fantoccini::error::NewSessionError) -> Self {
        ScrapeError::Driver(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ScrapeError>;
