// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment/CLI surface (§6): listen addresses and the persistence DSN.

use std::time::Duration;

/// Top-level configuration for the Pika core.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "pika-server", version, about = "Pika host-monitoring core")]
pub struct PikaConfig {
    /// Host to bind the duplex agent endpoint on.
    #[arg(long, default_value = "0.0.0.0", env = "PIKA_AGENT_HOST")]
    pub agent_host: String,

    /// Port for the duplex agent endpoint (§6 Agent ↔ Server frames).
    #[arg(long, default_value_t = 9100, env = "PIKA_AGENT_PORT")]
    pub agent_port: u16,

    /// Host to bind the admin/API collaborator's listen address on.
    ///
    /// The admin HTTP/JSON surface itself (CRUD for agents, monitors, auth)
    /// is an external collaborator; the core only exposes a health endpoint
    /// here.
    #[arg(long, default_value = "127.0.0.1", env = "PIKA_ADMIN_HOST")]
    pub admin_host: String,

    /// Port for the admin listen address.
    #[arg(long, default_value_t = 9101, env = "PIKA_ADMIN_PORT")]
    pub admin_port: u16,

    /// Persistence DSN. A bare path is treated as a SQLite file; use
    /// `sqlite::memory:` for ephemeral runs.
    #[arg(long, default_value = "pika.db", env = "PIKA_DSN")]
    pub dsn: String,

    /// Seconds of silence before an agent transitions to `offline` (§3).
    #[arg(long, default_value_t = 90, env = "PIKA_OFFLINE_THRESHOLD_SECS")]
    pub offline_threshold_secs: u64,

    /// Liveness sweeper interval (§4.A).
    #[arg(long, default_value_t = 10, env = "PIKA_SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// Alert evaluation tick interval (§4.E).
    #[arg(long, default_value_t = 10, env = "PIKA_ALERT_TICK_SECS")]
    pub alert_tick_secs: u64,

    /// Notification dispatch worker pool size (§5).
    #[arg(long, default_value_t = 8, env = "PIKA_NOTIFY_WORKERS")]
    pub notify_workers: usize,

    /// Persistence connection pool size (§5).
    #[arg(long, default_value_t = 16, env = "PIKA_DB_POOL_SIZE")]
    pub db_pool_size: u32,

    /// Grace period for in-flight writes to complete during shutdown (§5).
    #[arg(long, default_value_t = 5, env = "PIKA_SHUTDOWN_GRACE_SECS")]
    pub shutdown_grace_secs: u64,
}

impl PikaConfig {
    pub fn offline_threshold(&self) -> Duration {
        Duration::from_secs(self.offline_threshold_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn alert_tick_interval(&self) -> Duration {
        Duration::from_secs(self.alert_tick_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// A configuration suitable for unit/integration tests: in-memory
    /// storage, loopback hosts, ephemeral ports (port 0).
    pub fn for_test() -> Self {
        Self {
            agent_host: "127.0.0.1".to_owned(),
            agent_port: 0,
            admin_host: "127.0.0.1".to_owned(),
            admin_port: 0,
            dsn: "sqlite::memory:".to_owned(),
            offline_threshold_secs: 90,
            sweep_interval_secs: 10,
            alert_tick_secs: 10,
            notify_workers: 2,
            db_pool_size: 4,
            shutdown_grace_secs: 1,
        }
    }
}
