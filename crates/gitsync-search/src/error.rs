//! Document store and search error types.

use thiserror::Error;

/// Errors returned by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document or index does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store answered with a non-success status
    #[error("Store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Request or response body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store cannot serve the request right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Configured base URL is unusable
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Failures worth retrying: transport errors, overload and 5xx answers.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Http(_) | StoreError::Unavailable(_) => true,
            StoreError::Status { status, .. } => *status >= 500 || *status == 408,
            StoreError::NotFound(_) | StoreError::Serialization(_) | StoreError::InvalidUrl(_) => {
                false
            }
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors that can occur while running a query.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A hit or aggregation did not have the expected shape
    #[error("Malformed response: {0}")]
    Response(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "Store returned status 503: busy");
        assert!(!err.is_not_found());
        assert!(StoreError::NotFound("1_a.rb".to_string()).is_not_found());
        assert!(err.is_transient());
        assert!(!StoreError::Status {
            status: 400,
            body: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
