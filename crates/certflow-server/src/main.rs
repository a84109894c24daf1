use anyhow::Result;
use certflow_config::ConfigLoader;
use certflow_server::{build, logging, signal};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Certificate generation and delivery service")]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 不存在时忽略
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    let config = loader.load()?;

    logging::init(&config.logging)?;
    info!(config = ?args.config, "Starting certflow server");

    let app = build(config).await?;
    let addr = app.config.server.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app.router.clone())
        .with_graceful_shutdown(async {
            let received = signal::wait_for_signal().await;
            info!(signal = ?received, "Shutting down");
        })
        .await?;

    if let Err(e) = app.engine.shutdown().await {
        warn!(error = %e, "Engine shutdown failed");
    }

    info!("Server stopped");
    Ok(())
}
