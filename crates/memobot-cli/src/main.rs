mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use memobot_core::daemon::http::{HttpConfig, HttpServer};
use memobot_core::{AppConfig, AppCore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::CheckConfig => check_config(),
    }
}

async fn serve() -> Result<()> {
    let config = AppConfig::from_env()?;
    let http = HttpConfig {
        host: config.http_host.clone(),
        port: config.http_port,
    };
    let core = Arc::new(AppCore::new(config));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    HttpServer::new(http, core).run(shutdown_rx).await
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn check_config() -> Result<()> {
    let config = AppConfig::from_env()?;

    println!("Configuration OK");
    println!("  model:           {}", config.openrouter_model);
    println!("  context top-k:   {}", config.context_top_k);
    println!("  turn timeout:    {}s", config.turn_timeout_secs);
    println!("  pinecone host:   {}", config.pinecone_index_host);
    println!("  phone number id: {}", config.whatsapp_phone_number_id);
    println!("  listen address:  {}:{}", config.http_host, config.http_port);

    Ok(())
}
