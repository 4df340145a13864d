//! `localllm status` — Show the effective configuration.

use std::path::Path;

use localllm_config::AppConfig;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("🦙 localllm Status");
    println!("==================");
    println!("  Model dir:     {}", config.model.path.display());
    println!("  Model name:    {}", config.model.name);
    println!("  Extension:     .{}", config.model.extension.trim_start_matches('.'));
    println!("  Context size:  {}", config.model.context_size);
    println!("  Threads:       {}", config.model.threads);
    println!("  GPU layers:    {}", config.model.gpu_layers);
    println!("  Listening:     {}", config.server.bind_addr());
    if config.server.cors_origins.is_empty() {
        println!("  CORS:          any origin");
    } else {
        println!("  CORS:          {}", config.server.cors_origins.join(", "));
    }

    match localllm_providers::find_model_file(&config.model.path, &config.model.extension) {
        Ok(path) => println!("\n  ✅ Model file: {}", path.display()),
        Err(e) => println!("\n  ⚠️  {e} — the server will run in mock mode"),
    }
    if cfg!(not(feature = "local")) {
        println!("  ⚠️  Built without the `local` feature — the server will run in mock mode");
    }

    Ok(())
}
