//! Completion router — chooses between the loaded model and the mock policy.
//!
//! The generator handle is injected once at construction and never replaced;
//! a router built without one answers every request from the mock policy.

use std::sync::Arc;

use tracing::{debug, info};

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use crate::generator::{GenerationRequest, Generator};
use crate::{mock, prompt};

/// Sequences that end a generated assistant turn.
pub const STOP_SEQUENCES: [&str; 2] = ["User:", "\n\n"];

/// Routes completion requests to a generation strategy.
#[derive(Clone)]
pub struct CompletionRouter {
    generator: Option<Arc<dyn Generator>>,
}

impl CompletionRouter {
    pub fn new(generator: Option<Arc<dyn Generator>>) -> Self {
        Self { generator }
    }

    /// A router that always answers from the mock policy.
    pub fn mock() -> Self {
        Self::new(None)
    }

    pub fn model_loaded(&self) -> bool {
        self.generator.is_some()
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.generator.as_deref().map(|g| g.name())
    }

    /// Produce a single-choice completion for `request`.
    ///
    /// Generator failures propagate unchanged; nothing is retried.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let prompt = prompt::assemble(&request.messages);
        debug!(
            messages = request.messages.len(),
            prompt_len = prompt.len(),
            "Prompt assembled"
        );

        let response_text = match &self.generator {
            Some(generator) => {
                info!(backend = generator.name(), "Generating response with loaded model");
                let output = generator
                    .generate(GenerationRequest {
                        prompt,
                        max_tokens: request.max_tokens,
                        temperature: request.temperature,
                        stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
                    })
                    .await?;
                output.trim().to_string()
            }
            None => {
                info!("Generating mock response (model not loaded)");
                mock::respond(request.last_content())
            }
        };

        Ok(CompletionResponse::single(&request.model, response_text))
    }
}

impl std::fmt::Debug for CompletionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRouter")
            .field("backend", &self.backend_name())
            .finish()
    }
}
