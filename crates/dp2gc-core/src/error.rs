//! Error types for dp2gc-core

use thiserror::Error;

/// Main error type for dp2gc-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The portal rejected the supplied credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Any other scraper failure. Not classified further.
    #[error("Scraper error: {0}")]
    Scraper(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error came from rejected credentials
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Result type alias for dp2gc-core
pub type Result<T> = std::result::Result<T, Error>;
