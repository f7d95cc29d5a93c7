//! Error taxonomy for the scraping pipeline.

/// All errors that can occur while scraping a course.
///
/// Login and page-fetch errors end a run; `Parse` is raised per element and
/// swallowed by the traverser.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("Login token not found on {url}")]
    TokenNotFound { url: String },

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Unreachable: {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("HTTP error {status} for {url}")]
    HttpError { url: String, status: u16 },

    #[error("Parse error in element {index}: {reason}")]
    Parse { index: usize, reason: String },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid selector '{selector}' in profile {profile}")]
    InvalidSelector { profile: String, selector: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Build an `Unreachable` error from a transport failure.
    pub fn unreachable(url: &str, reason: impl std::fmt::Display) -> Self {
        ScrapeError::Unreachable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error belongs to the authentication step.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ScrapeError::TokenNotFound { .. } | ScrapeError::LoginFailed(_)
        )
    }

    /// Whether this error came from the network layer.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            ScrapeError::Unreachable { .. } | ScrapeError::HttpError { .. }
        )
    }
}

/// Convenience result type.
pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
