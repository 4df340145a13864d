//! Generation backends for localllm.
//!
//! All backends implement the `localllm_core::Generator` trait. The loader
//! discovers a model file at startup and builds the backend, or reports that
//! the server should run in mock mode.

pub mod loader;
#[cfg(feature = "local")]
pub mod local;
pub mod stop;

pub use loader::{LoadError, find_model_file, load_generator};
#[cfg(feature = "local")]
pub use local::{LocalGenerator, LocalSettings};
