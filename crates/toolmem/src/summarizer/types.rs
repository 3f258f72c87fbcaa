//! Summarizer error type

/// Summarizer-specific errors
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarizer_error_display() {
        let err = SummarizerError::UpstreamUnavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Upstream unavailable: connection refused");

        let err = SummarizerError::InvalidResponse("empty summary".to_string());
        assert_eq!(err.to_string(), "Invalid response: empty summary");
    }
}
