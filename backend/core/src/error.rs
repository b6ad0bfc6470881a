use thiserror::Error;

/// Top-level error type for the AgroLens services.
#[derive(Debug, Error)]
pub enum AgroError {
    #[error("No file provided")]
    MissingFile,

    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("missing credential: {0} is not configured")]
    MissingCredential(String),

    #[error("AI analysis failed: {status}")]
    Upstream { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgroError {
    /// Whether the caller sent a bad request, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingFile | Self::InvalidInput(_))
    }
}

pub type Result<T, E = AgroError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_message_is_user_facing() {
        assert_eq!(AgroError::MissingFile.to_string(), "No file provided");
        assert!(AgroError::MissingFile.is_client_error());
    }

    #[test]
    fn upstream_error_reports_status_only() {
        let err = AgroError::Upstream {
            status: 429,
            message: "quota exceeded for key sk-abc".into(),
        };
        assert_eq!(err.to_string(), "AI analysis failed: 429");
        assert!(!err.is_client_error());
    }
}
