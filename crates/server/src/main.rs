use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod api;
mod bridge;
mod config;
mod state;
mod ui;
mod websocket;

use config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "storybook-mcp")]
#[command(about = "MCP server exposing a Storybook to coding agents", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "storybook-mcp.toml")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "6007")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Storybook dev server origin, overrides the configuration file
    #[arg(long, env = "STORYBOOK_ORIGIN")]
    origin: Option<String>,

    /// Do not record usage telemetry
    #[arg(long, env = "STORYBOOK_DISABLE_TELEMETRY")]
    disable_telemetry: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storybook_mcp=info,storybook_mcp_server=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting Storybook MCP server");

    // Load configuration
    let mut config = ServerConfig::load(&args.config)?;
    if let Some(origin) = args.origin {
        url::Url::parse(&origin).with_context(|| format!("Invalid Storybook origin: {}", origin))?;
        config.origin = origin;
    }
    config.disable_telemetry |= args.disable_telemetry;
    tracing::info!("Storybook origin: {}", config.origin);

    let addr = format!("{}:{}", args.host, args.port);
    api::serve(&addr, config).await?;

    Ok(())
}
