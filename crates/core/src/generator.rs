//! Generator trait — the abstraction over text-generation backends.
//!
//! A Generator takes a flattened prompt and produces a text continuation.
//! How it tokenizes and samples is entirely its own business.
//!
//! Implementations: the candle-backed local GGUF generator, test doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The flattened prompt, already ending with the assistant cue
    pub prompt: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 = greedy)
    pub temperature: f32,

    /// Generation halts before any of these sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

/// The core Generator trait.
///
/// The completion router holds at most one of these for the lifetime of the
/// process and shares it read-only across concurrent requests.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this backend (e.g., "candle").
    fn name(&self) -> &str;

    /// Produce a continuation of `request.prompt`.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stop_list_is_omitted() {
        let req = GenerationRequest {
            prompt: "User: hi\n\nAssistant: ".into(),
            max_tokens: 16,
            temperature: 0.0,
            stop: vec![],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("stop").is_none());
        assert_eq!(json["max_tokens"], 16);
    }
}
