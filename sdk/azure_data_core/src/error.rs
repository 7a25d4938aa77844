use thiserror::Error;

/// Errors that can occur when talking to an Azure data-plane service.
#[derive(Error, Debug)]
pub enum SdkError {
    /// The service answered with a non-success status and no structured error body.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Credential resolution failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A request or response payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL is invalid, or a server-issued link points elsewhere.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// The service returned a structured error response.
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },

    /// A request builder was given invalid or incomplete input.
    #[error("Invalid request: {0}")]
    Builder(String),

    /// The current page of a feed was requested before any page was fetched.
    #[error("no page has been fetched yet; call fetch_next() first")]
    NoCurrentPage,
}

impl SdkError {
    /// Create an [`SdkError::Http`] error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an [`SdkError::InvalidEndpoint`] error without an underlying parse error.
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: None,
        }
    }

    /// Create an [`SdkError::InvalidEndpoint`] error wrapping a URL parse error.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: Some(source),
        }
    }

    /// The HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for SDK operations.
pub type SdkResult<T> = std::result::Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display() {
        let err = SdkError::http(404, "Not Found");
        assert_eq!(err.to_string(), "HTTP error: 404 - Not Found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn no_current_page_is_labeled() {
        let err = SdkError::NoCurrentPage;
        assert!(err.to_string().contains("fetch_next"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn invalid_endpoint_keeps_source() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = SdkError::invalid_endpoint_with_source("bad endpoint", parse_err);
        assert!(std::error::Error::source(&err).is_some());
    }
}
