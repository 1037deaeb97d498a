//! Completion-service error types.
//!
//! The orchestration core never propagates these outward: every error is
//! caught at the call site and folded into a tagged result envelope. The
//! classification here exists so the envelope message says what actually
//! went wrong (network vs. missing model vs. malformed output).

use thiserror::Error;

/// Error from a completion-service call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Connection failed, timed out, or the request never completed.
    #[error("network error: {0}")]
    Network(String),

    /// The runtime does not have the requested model.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The runtime returned a non-success HTTP status.
    #[error("completion service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("failed to parse completion response: {0}")]
    Parse(String),
}

impl LlmError {
    /// Classify a non-success HTTP status from the runtime.
    pub fn from_status(status: u16, model: &str, body: String) -> Self {
        if status == 404 {
            LlmError::ModelNotFound(model.to_string())
        } else {
            LlmError::Service {
                status,
                message: body,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            LlmError::from_status(404, "llama2", String::new()),
            LlmError::ModelNotFound(_)
        ));
        assert!(matches!(
            LlmError::from_status(500, "llama2", String::new()),
            LlmError::Service { status: 500, .. }
        ));
    }
}
