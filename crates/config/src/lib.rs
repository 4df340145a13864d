//! Configuration loading, validation, and management for localllm.
//!
//! Loads configuration from an optional TOML file, then applies environment
//! variable overrides (`MODEL_PATH`, `MODEL_NAME`, `PORT`, ...). Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model discovery and loading
    #[serde(default)]
    pub model: ModelConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory scanned for a model file at startup
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Display label for the served model
    #[serde(default = "default_model_name")]
    pub name: String,

    /// File extension (without the dot) a model file must have
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Context window in tokens
    #[serde(default = "default_context_size")]
    pub context_size: usize,

    /// CPU threads used for inference
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Layers to offload to the GPU (0 = CPU only)
    #[serde(default)]
    pub gpu_layers: u32,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("/models")
}
fn default_model_name() -> String {
    "phi-3-mini".into()
}
fn default_extension() -> String {
    "gguf".into()
}
fn default_context_size() -> usize {
    2048
}
fn default_threads() -> usize {
    4
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            name: default_model_name(),
            extension: default_extension(),
            context_size: default_context_size(),
            threads: default_threads(),
            gpu_layers: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,

    /// Allowed CORS origins. Empty = any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit: default_body_limit(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Load configuration from `path` (if given) and the process environment.
    ///
    /// Environment variables take priority over the file:
    /// - `MODEL_PATH`, `MODEL_NAME`
    /// - `MODEL_CONTEXT_SIZE`, `MODEL_THREADS`, `MODEL_GPU_LAYERS`
    /// - `HOST`, `PORT`, `CORS_ORIGINS` (comma-separated)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// The file must exist: a path named on the command line or in
    /// `LOCALLLM_CONFIG` that cannot be read is an error, not a silent
    /// fallback to defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(name) = lookup("MODEL_NAME") {
            self.model.name = name;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(size) = parse_var(&lookup, "MODEL_CONTEXT_SIZE")? {
            self.model.context_size = size;
        }
        if let Some(threads) = parse_var(&lookup, "MODEL_THREADS")? {
            self.model.threads = threads;
        }
        if let Some(layers) = parse_var(&lookup, "MODEL_GPU_LAYERS")? {
            self.model.gpu_layers = layers;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must be non-zero".into()));
        }
        if self.server.body_limit == 0 {
            return Err(ConfigError::ValidationError(
                "server.body_limit must be non-zero".into(),
            ));
        }
        if self.model.context_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.context_size must be at least 1".into(),
            ));
        }
        if self.model.threads == 0 {
            return Err(ConfigError::ValidationError(
                "model.threads must be at least 1".into(),
            ));
        }
        if self.model.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::ValidationError(
                "model.extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var: key, value }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for environment variable {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
