//! localllm CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Load the model (or fall back to mock mode) and start the HTTP server
//! - `status`  — Show the effective configuration and which model would load
//!
//! Running without a subcommand is the same as `serve`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "localllm",
    about = "localllm — OpenAI-compatible local chat-completion server",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "LOCALLLM_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(commands::serve::ServeArgs),

    /// Show effective configuration
    Status,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::run(config, args)?,
        None => commands::serve::run(config, commands::serve::ServeArgs::default())?,
        Some(Commands::Status) => commands::status::run(config)?,
    }

    Ok(())
}
