// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level shared application handle (§9 "Global mutable state... is
//! encapsulated behind interfaces with get/set/iterate operations").

use tokio_util::sync::CancellationToken;

use crate::agent_link::{AuthRateLimiter, SessionTable};
use crate::alert::engine::AlertRuntime;
use crate::config::PikaConfig;
use crate::ingest::aggregator::Aggregator;
use crate::ingest::overlay::LatestOverlay;
use crate::ingest::writer::WriterPool;
use crate::monitor::coordinator::Coordinator as MonitorCoordinator;
use crate::monitor::state_machine::VerdictTable;
use crate::storage::Storage;
use crate::uptime::UptimeCache;

/// Shared state injected into every axum handler and background worker.
pub struct AppState {
    pub config: PikaConfig,
    pub storage: Storage,
    pub shutdown: CancellationToken,
    /// Per-agent duplex session table (§4.A).
    pub sessions: SessionTable,
    /// Per-IP throttle for logging rejected handshakes (§4.A, §7.3).
    pub auth_rate_limiter: AuthRateLimiter,
    /// Non-blocking `(agentId, kind, subject) -> latestValue` overlay (§4.B).
    pub overlay: LatestOverlay,
    /// Sharded tumbling-window aggregator state (§4.B).
    pub aggregator: Aggregator,
    /// Per-kind raw-sample batching writers (§4.B, §5).
    pub writer: WriterPool,
    /// Last-known verdict per monitor, used for fanout tie-break (§4.C).
    pub verdicts: VerdictTable,
    /// In-flight tick registry for the Monitor Scheduler (§4.C, §5).
    pub monitor_coordinator: MonitorCoordinator,
    /// In-memory uptime/SLA cache (§4.D).
    pub uptime_cache: UptimeCache,
    /// Sustain-window bookkeeping for the Alert Rule Engine (§4.E).
    pub alert_runtime: AlertRuntime,
}

impl AppState {
    pub fn new(config: PikaConfig, storage: Storage) -> Self {
        let shutdown = CancellationToken::new();
        let writer = WriterPool::spawn(storage.clone(), shutdown.clone());
        Self {
            config,
            storage,
            shutdown,
            sessions: SessionTable::new(),
            auth_rate_limiter: AuthRateLimiter::new(),
            overlay: LatestOverlay::new(),
            aggregator: Aggregator::new(),
            writer,
            verdicts: VerdictTable::new(),
            monitor_coordinator: MonitorCoordinator::new(),
            uptime_cache: UptimeCache::new(),
            alert_runtime: AlertRuntime::new(),
        }
    }
}
