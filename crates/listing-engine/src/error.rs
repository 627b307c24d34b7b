use thiserror::Error;

/// Failure kinds of one generation action. None of them are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{0}")]
    Configuration(String),

    #[error("Failed to read image {path}: {reason}")]
    Encoding { path: String, reason: String },

    #[error("No response from AI")]
    EmptyResponse,

    #[error("AI response was not a valid listing: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Service(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Encoding { .. } => "encoding",
            Self::EmptyResponse => "empty_response",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Service(_) => "service",
        }
    }
}

/// Controller misuse: actions the UI would have disabled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Select at least one image first")]
    NoFiles,

    #[error("A generation is already in progress")]
    AlreadyGenerating,

    #[error("No generation is in progress")]
    NotGenerating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_user_facing() {
        assert_eq!(GenerationError::EmptyResponse.to_string(), "No response from AI");
        let err = GenerationError::Encoding {
            path: "a.png".to_string(),
            reason: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to read image a.png: missing");
        assert_eq!(err.kind(), "encoding");
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            GenerationError::Configuration(String::new()).kind(),
            GenerationError::EmptyResponse.kind(),
            GenerationError::MalformedResponse(String::new()).kind(),
            GenerationError::Service(String::new()).kind(),
        ];
        for (idx, kind) in kinds.iter().enumerate() {
            assert!(!kinds[idx + 1..].contains(kind));
        }
    }
}
