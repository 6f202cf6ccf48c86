use std::net::SocketAddr;

use anyhow::Context;
use auth_server::{build_server_filter, CredentialService, Settings};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::parse();

    init_tracing(settings.verbose);
    info!(?settings, "configuration loaded");

    if settings.uses_in_memory_store() {
        warn!(
            store = settings.store_kind(),
            "accounts are kept in memory and will be lost on restart"
        );
    } else {
        info!(store = settings.store_kind(), "opening user store");
    }

    let database = match settings.open_user_database().await {
        Ok(database) => database,
        Err(e) => {
            error!(error = ?e, "could not open user store");
            return Err(e).context("could not open user store");
        }
    };

    let service = CredentialService::new(settings.auth_config(), database);
    let routes = build_server_filter(&service);

    let addr = SocketAddr::new(settings.host, settings.port);
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!("server is running on http://{addr}");
    server.await;
    info!("server stopped");

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = ?e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
