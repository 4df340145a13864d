//! # localllm Core
//!
//! Domain types, traits, and error definitions for the localllm
//! chat-completion server. This crate has **no HTTP or ML dependencies**:
//! it defines the request/response envelopes, prompt assembly, the mock
//! policy, and the router that ties them to a [`Generator`].
//!
//! Backends live in `localllm-providers`; transport lives in
//! `localllm-gateway`.

pub mod completion;
pub mod error;
pub mod generator;
pub mod message;
pub mod mock;
pub mod prompt;
pub mod router;

// Re-export key types at crate root for ergonomics
pub use completion::{
    Choice, CompletionChunk, CompletionRequest, CompletionResponse, FinishReason,
};
pub use error::{Error, GenerationError, Result};
pub use generator::{GenerationRequest, Generator};
pub use message::{Message, Role};
pub use router::CompletionRouter;
