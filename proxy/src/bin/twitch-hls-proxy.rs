use clap::Parser;
use eyre::Context;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use twitch_hls_proxy::server::ROUTES;
use twitch_hls_proxy::{App, Config, serve};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let config = Config::parse();
    let app = App::from_config(&config).context("set up upstream clients")?;

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind to {addr}"))?;

    tracing::info!(
        "twitch-hls-proxy listening on http://{}",
        listener.local_addr().context("get local address")?
    );
    tracing::info!(environment = config.environment.as_str(), "environment");
    let credentials = app.helix.tokens().credentials();
    if credentials.has_app_credentials() {
        tracing::info!("Helix credentials configured");
    } else {
        tracing::warn!(
            "TWITCH_CLIENT_ID / TWITCH_CLIENT_SECRET not set; /api/channels and /api/videos will fail"
        );
    }
    for route in ROUTES {
        tracing::info!("  {route}");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            // dropping the sender would stop the server
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl-C");
        let _ = shutdown_tx.send(true);
    });

    serve(listener, Arc::new(app), shutdown_rx).await
}
