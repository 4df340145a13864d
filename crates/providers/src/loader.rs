//! Model loader — finds a model file at startup and builds the generator.
//!
//! Any failure (missing directory, no matching file, backend not compiled in,
//! load error) is logged and yields `None`; the server then answers from the
//! mock policy for the lifetime of the process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use localllm_config::ModelConfig;
use localllm_core::Generator;
use tracing::{info, warn};

/// Why no generator could be built.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Model path {0} does not exist")]
    DirectoryMissing(PathBuf),

    #[error("No .{extension} model file found in {dir}")]
    NoModelFile { dir: PathBuf, extension: String },

    #[error("Failed to read model directory {dir}: {reason}")]
    Io { dir: PathBuf, reason: String },

    #[error("Local inference is not compiled in (rebuild with the `local` feature)")]
    Unsupported,

    #[error("Failed to load model: {0}")]
    Backend(String),
}

/// First file in `dir` (by name) whose extension equals `extension`.
pub fn find_model_file(dir: &Path, extension: &str) -> Result<PathBuf, LoadError> {
    if !dir.exists() {
        return Err(LoadError::DirectoryMissing(dir.to_path_buf()));
    }

    let io_err = |e: std::io::Error| LoadError::Io {
        dir: dir.to_path_buf(),
        reason: e.to_string(),
    };

    let wanted = extension.trim_start_matches('.');
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let matches = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == wanted);
        if matches {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::NoModelFile {
            dir: dir.to_path_buf(),
            extension: wanted.to_string(),
        })
}

/// Discover and load the configured model, or `None` for mock mode.
///
/// Blocking: reads model weights from disk.
pub fn load_generator(config: &ModelConfig) -> Option<Arc<dyn Generator>> {
    match try_load(config) {
        Ok(generator) => {
            info!(backend = generator.name(), "Model loaded successfully");
            Some(generator)
        }
        Err(e) => {
            warn!(error = %e, "No model available, server will run in mock mode");
            None
        }
    }
}

fn try_load(config: &ModelConfig) -> Result<Arc<dyn Generator>, LoadError> {
    let model_file = find_model_file(&config.path, &config.extension)?;
    info!(path = %model_file.display(), "Loading model");
    build_backend(&model_file, config)
}

#[cfg(feature = "local")]
fn build_backend(path: &Path, config: &ModelConfig) -> Result<Arc<dyn Generator>, LoadError> {
    let settings = crate::local::LocalSettings::from(config);
    let generator = crate::local::LocalGenerator::load(path, settings)?;
    Ok(Arc::new(generator))
}

#[cfg(not(feature = "local"))]
fn build_backend(_path: &Path, _config: &ModelConfig) -> Result<Arc<dyn Generator>, LoadError> {
    Err(LoadError::Unsupported)
}
