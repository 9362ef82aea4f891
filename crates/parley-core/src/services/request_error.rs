use thiserror::Error;

/// Failure of one assistant request.
///
/// `Cancelled` is benign: it is never rendered as a chat message. Every other
/// variant becomes an error message whose body embeds the display text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Request was cancelled")]
    Cancelled,

    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The endpoint answered with an `{ "error": .. }` body
    #[error("{0}")]
    Remote(String),

    #[error("Failed to reach assistant: {0}")]
    Transport(String),

    #[error("Invalid assistant response: {0}")]
    InvalidResponse(String),
}

impl RequestError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_embeds_reason() {
        assert_eq!(
            RequestError::Status(500).to_string(),
            "HTTP error! status: 500"
        );
        assert_eq!(
            RequestError::Remote("model overloaded".into()).to_string(),
            "model overloaded"
        );
        assert!(RequestError::Cancelled.is_cancelled());
        assert!(!RequestError::Status(404).is_cancelled());
    }
}
