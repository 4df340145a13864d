//! `localllm serve` — Load the model and start the HTTP server.

use std::path::{Path, PathBuf};

use localllm_config::AppConfig;
use localllm_core::CompletionRouter;
use tracing::{info, warn};

#[derive(Debug, Default, clap::Args)]
pub struct ServeArgs {
    /// Override the listening port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the bind address
    #[arg(long)]
    pub host: Option<String>,

    /// Override the directory scanned for a model file
    #[arg(short, long)]
    pub model_path: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(path) = self.model_path {
            config.model.path = path;
        }
    }
}

pub fn run(config_path: Option<&Path>, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    args.apply(&mut config);
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        model_path = %config.model.path.display(),
        model_name = %config.model.name,
        "Starting LLM server"
    );

    let model_config = config.model.clone();
    let generator =
        tokio::task::spawn_blocking(move || localllm_providers::load_generator(&model_config))
            .await?;

    let router = CompletionRouter::new(generator);
    if !router.model_loaded() {
        warn!("Serving canned responses: no model is loaded");
    }

    localllm_gateway::start(config.server, router).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = AppConfig::default();
        ServeArgs {
            port: Some(9000),
            host: None,
            model_path: Some(PathBuf::from("/tmp/models")),
        }
        .apply(&mut config);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.path, PathBuf::from("/tmp/models"));
    }

    #[test]
    fn no_flags_keep_config() {
        let mut config = AppConfig::default();
        ServeArgs::default().apply(&mut config);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.path, PathBuf::from("/models"));
    }
}
