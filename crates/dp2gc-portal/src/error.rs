//! Error types for dp2gc-portal

use thiserror::Error;

/// dp2gc-portal error type
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    #[error("XML parsing error: {0}")]
    XmlParseError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<PortalError> for dp2gc_core::Error {
    fn from(e: PortalError) -> Self {
        match e {
            PortalError::Authentication(msg) => dp2gc_core::Error::Authentication(msg),
            other => dp2gc_core::Error::Scraper(other.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PortalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_maps_to_core_authentication() {
        let core: dp2gc_core::Error = PortalError::Authentication("rejected".to_string()).into();
        assert!(core.is_authentication());
    }

    #[test]
    fn test_other_errors_map_to_scraper() {
        let core: dp2gc_core::Error = PortalError::InvalidMonth(13).into();
        assert!(matches!(core, dp2gc_core::Error::Scraper(ref msg) if msg.contains("13")));
    }
}
