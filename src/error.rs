//! Error type shared by the mapping core and the fetch layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpiderError>;

#[derive(Debug, Error)]
pub enum SpiderError {
    /// The input is not a syntactically valid URL
    #[error("URL parsing error: {0}")]
    Parse(#[from] url::ParseError),

    /// Relative links are undefined between two different hosts
    #[error("cannot relate {base} to {target}: hosts differ")]
    CrossOrigin { base: String, target: String },

    /// A match rule of an unknown kind was configured
    #[error("invalid rule configuration: {0}")]
    Configuration(String),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
