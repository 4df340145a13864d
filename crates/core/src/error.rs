//! Error types for the localllm domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! An absent backend is not an error: the router falls back to the mock policy.

use thiserror::Error;

/// The top-level error type for completion operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation errors ---
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    // --- Request validation ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by a [`Generator`](crate::generator::Generator) backend.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Prompt of {prompt_tokens} tokens exceeds the context window of {context_size}")]
    ContextOverflow {
        prompt_tokens: usize,
        context_size: usize,
    },

    #[error("Generation task failed: {0}")]
    TaskFailed(String),
}
