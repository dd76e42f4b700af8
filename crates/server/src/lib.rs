// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pika: an agent-based host monitoring and service-availability core.
//!
//! Agents connect over a duplex WebSocket link (§4.A), report telemetry
//! that is aggregated into tumbling windows (§4.B) and probe results that
//! feed a consensus-based verdict state machine (§4.C), from which uptime
//! statistics (§4.D) and alerting (§4.E, §4.F) are derived. An external
//! administrative collaborator drives configuration through the
//! [`property`] facade (§4.G) and this crate's storage layer directly.

pub mod agent_link;
pub mod alert;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod monitor;
pub mod notify;
pub mod property;
pub mod state;
pub mod storage;
pub mod time;
pub mod transport;
pub mod uptime;

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::PikaConfig;
use crate::state::AppState;

/// Run the Pika core until shutdown: bind the agent-facing HTTP/WS
/// listener, spawn every background worker under the shared cancellation
/// token, and serve until the process receives a shutdown signal.
pub async fn run(config: PikaConfig) -> anyhow::Result<()> {
    let storage = crate::storage::Storage::connect(&config.dsn, config.db_pool_size).await?;
    let addr = format!("{}:{}", config.agent_host, config.agent_port);
    let state = Arc::new(AppState::new(config, storage));

    agent_link::sweeper::spawn(state.clone());
    monitor::coordinator::spawn(state.clone());
    ingest::retention::spawn(state.clone());
    ingest::aggregator::spawn(state.clone());
    alert::engine::spawn(state.clone());
    notify::spawn(state.clone());
    spawn_signal_watcher(state.shutdown.clone());

    tracing::info!(%addr, "pika agent link listening");
    let router = transport::build_router(state.clone());
    let listener = TcpListener::bind(&addr).await?;

    let shutdown = state.shutdown.clone();
    axum::serve(listener, router.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tokio::time::sleep(state.config.shutdown_grace()).await;
    Ok(())
}

/// Cancel `shutdown` on SIGINT (Ctrl-C) or, on unix, SIGTERM — whichever
/// arrives first (§6 graceful shutdown). Signal installation is fallible;
/// on failure we log and fall back to waiting on the other signal alone
/// rather than panicking the process.
fn spawn_signal_watcher(shutdown: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {}
                Err(e) => {
                    tracing::error!(err = %e, "failed to install SIGINT handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::error!(err = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        shutdown.cancel();
    });
}
