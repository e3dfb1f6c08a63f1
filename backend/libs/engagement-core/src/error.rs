//! Error types for engagement operations

use thiserror::Error;

/// Engagement errors
///
/// Every failure is handled at the call site that triggered it; nothing in
/// the core retries on its own.
#[derive(Error, Debug)]
pub enum EngagementError {
    /// Rejected locally before any request was issued
    #[error("Validation error: {0}")]
    Validation(String),

    /// Post, comment or reply no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure (connection refused, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status returned by the server
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Payload serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngagementError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Short failure text suitable for a toast/banner in the initiating view
    pub fn notice(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(_) => "This content is no longer available. Try refreshing.".to_string(),
            Self::Network(_) => "Network problem. Please try again.".to_string(),
            Self::Server { .. } | Self::Serialization(_) | Self::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Result type alias for engagement operations
pub type EngagementResult<T> = Result<T, EngagementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngagementError::validation("Comment cannot be empty");
        assert_eq!(err.to_string(), "Validation error: Comment cannot be empty");

        let err = EngagementError::Server {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (502): bad gateway");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());

        let err: EngagementError = json_err.unwrap_err().into();
        assert!(matches!(err, EngagementError::Serialization(_)));
    }

    #[test]
    fn test_notice_keeps_validation_message() {
        let err = EngagementError::validation("Reply cannot be empty");
        assert_eq!(err.notice(), "Reply cannot be empty");
        assert!(err.is_validation());
        assert!(!err.is_not_found());

        let err = EngagementError::not_found("post");
        assert!(err.notice().contains("refreshing"));
    }
}
