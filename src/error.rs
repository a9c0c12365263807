//! Error taxonomy shared by the browser session manager, the plain fetch
//! path and the extraction pipeline.

/// Boxed cause carried by [`ScrapeError::Automation`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Errors surfaced to callers of a public operation.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// A caller-supplied argument failed a precondition. Raised before any I/O.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Browser launch, navigation or selector-wait failure.
    #[error("Browser automation failed: {message}")]
    Automation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller stopped waiting before the session was established.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ScrapeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap an underlying browser failure, keeping it as the error source.
    pub fn automation(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::Automation {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// An automation failure with no underlying error (e.g. a timeout).
    pub fn automation_msg(message: impl Into<String>) -> Self {
        Self::Automation {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_automation(&self) -> bool {
        matches!(self, Self::Automation { .. })
    }
}

/// A single field could not be produced. Never propagated past the
/// extractor that raised it; see [`crate::pipeline::FetchTracker::field`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` could not be extracted: {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
