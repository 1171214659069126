//! tally agent
//!
//! - Loads `tally.yaml` (or the path given as the first argument)
//! - Registers declared metrics and starts the periodic snapshot exporter
//! - Serves `/healthz`, `/readyz`, `/metrics` until Ctrl-C
//! - On shutdown: drain, final flush, stop exporter

use tally_core::error::{Result, TallyError};
use tracing_subscriber::{fmt, EnvFilter};

use tally_agent::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code().as_str(), "tally-agent failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "tally.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen = cfg.server.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    state.start_exporter()?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, app = %state.cfg().app_name, "tally-agent starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| TallyError::Internal(format!("bind {listen} failed: {e}")))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TallyError::Internal(format!("server failed: {e}")));

    state.shutdown().await;
    tracing::info!("tally-agent stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed; shutting down");
    }
    tracing::info!("shutdown signal received");
}
