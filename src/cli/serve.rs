use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::time::interval;
use tracing::{debug, info, warn};
use unauth_gate::{BlockerConfig, Gate};
use unauth_guard::{build_router, TokenPolicy};

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Token accepted by the demo API (repeat for multiple tokens)
    #[arg(long = "auth-token", value_name = "TOKEN")]
    pub auth_token: Vec<String>,

    /// Token granted admin access by the demo API (repeat for multiple tokens)
    #[arg(long = "admin-token", value_name = "TOKEN")]
    pub admin_token: Vec<String>,

    /// How often expired failure counters are swept (0 disables the sweep)
    #[arg(long = "purge-interval", default_value = "60s", value_parser = humantime::parse_duration)]
    pub purge_interval: Duration,
}

pub async fn cmd_serve(args: ServeArgs, config: BlockerConfig) -> Result<()> {
    let gate = Arc::new(Gate::from_config(config).context("failed to build gate")?);
    spawn_purge_task(Arc::clone(&gate), args.purge_interval);

    let tokens = Arc::new(TokenPolicy::new(args.auth_token, args.admin_token));
    if tokens.is_empty() {
        warn!("No --auth-token configured; every API request will be answered with 401");
    }

    let router = build_router(gate, tokens);
    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(listen = %args.listen, "unauth-guard listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server exited unexpectedly")?;
    Ok(())
}

fn spawn_purge_task(gate: Arc<Gate>, every: Duration) {
    if every.is_zero() {
        info!("Failure counter sweep disabled (interval=0)");
        return;
    }
    info!(
        interval_secs = every.as_secs(),
        block_duration_secs = gate.block_duration().as_secs(),
        "Failure counter sweep enabled"
    );
    tokio::spawn(async move {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            let removed = gate.purge_expired();
            if removed > 0 {
                debug!(
                    removed,
                    tracked = gate.tracked_clients(),
                    "Purged expired failure counters"
                );
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
