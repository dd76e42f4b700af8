// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence: a pooled SQLite connection (§5, §6 "Persisted state layout").
//!
//! Single-node only (non-goal: distributed HA). Domain tables are Agent,
//! AlertRecord, Monitor, CheckResult, MetricAggregate (partitioned
//! conceptually by resolution), RawMetricSample, MonitorVerdict, and
//! Property. Time fields are epoch milliseconds throughout.

pub mod agents;
pub mod alerts;
pub mod metrics;
pub mod monitors;
pub mod property;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Pooled storage handle. Cheap to clone — wraps an `Arc`-backed `SqlitePool`.
#[derive(Clone)]
pub struct Storage {
    pub pool: SqlitePool,
}

impl Storage {
    /// Connect to the configured DSN, creating the database file if needed,
    /// and apply the schema. Pool size matches §5's "pooled (default 16)".
    pub async fn connect(dsn: &str, pool_size: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(dsn)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(pool_size).connect_with(options).await?;
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    /// Convenience constructor for tests: an isolated in-memory database.
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        Self::connect("sqlite::memory:", 4).await
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    api_key TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    hostname TEXT NOT NULL DEFAULT '',
    ip TEXT NOT NULL DEFAULT '',
    os TEXT NOT NULL DEFAULT '',
    arch TEXT NOT NULL DEFAULT '',
    version TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    status INTEGER NOT NULL DEFAULT 0,
    last_seen_at INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS raw_metric_samples (
    agent_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    subject TEXT NOT NULL DEFAULT '',
    ts_ms INTEGER NOT NULL,
    fields TEXT NOT NULL,
    PRIMARY KEY (agent_id, kind, subject, ts_ms)
);
CREATE INDEX IF NOT EXISTS idx_raw_ts ON raw_metric_samples (ts_ms);

CREATE TABLE IF NOT EXISTS metric_aggregates (
    agent_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    subject TEXT NOT NULL DEFAULT '',
    resolution TEXT NOT NULL,
    bucket_start INTEGER NOT NULL,
    min_value REAL NOT NULL,
    max_value REAL NOT NULL,
    sum_value REAL NOT NULL,
    count INTEGER NOT NULL,
    rate_max REAL,
    PRIMARY KEY (agent_id, kind, subject, resolution, bucket_start)
);
CREATE INDEX IF NOT EXISTS idx_agg_lookup
    ON metric_aggregates (agent_id, kind, subject, resolution, bucket_start);

CREATE TABLE IF NOT EXISTS monitors (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    target TEXT NOT NULL,
    interval_sec INTEGER NOT NULL,
    timeout_ms INTEGER NOT NULL,
    expected TEXT NOT NULL DEFAULT '',
    probe_selection TEXT NOT NULL,
    last_verdict TEXT NOT NULL DEFAULT 'unknown',
    cert_expiry_days INTEGER
);

CREATE TABLE IF NOT EXISTS check_results (
    monitor_id TEXT NOT NULL,
    agent_id TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    latency_ms INTEGER NOT NULL,
    status TEXT NOT NULL,
    http_code INTEGER,
    tls_expiry_at INTEGER,
    error TEXT,
    PRIMARY KEY (monitor_id, agent_id, started_at)
);
CREATE INDEX IF NOT EXISTS idx_check_monitor_time ON check_results (monitor_id, started_at);

CREATE TABLE IF NOT EXISTS monitor_verdicts (
    monitor_id TEXT NOT NULL,
    tick_at INTEGER NOT NULL,
    status TEXT NOT NULL,
    participant_count INTEGER NOT NULL,
    down_count INTEGER NOT NULL,
    min_latency_ms INTEGER,
    max_latency_ms INTEGER,
    PRIMARY KEY (monitor_id, tick_at)
);
CREATE INDEX IF NOT EXISTS idx_verdict_monitor_time ON monitor_verdicts (monitor_id, tick_at);

CREATE TABLE IF NOT EXISTS alert_rules (
    id TEXT PRIMARY KEY,
    agent_id TEXT,
    monitor_id TEXT,
    kind TEXT NOT NULL,
    threshold REAL NOT NULL,
    op TEXT NOT NULL,
    for_sec INTEGER NOT NULL,
    level TEXT NOT NULL,
    channels TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS alert_records (
    id TEXT PRIMARY KEY,
    rule_id TEXT NOT NULL,
    status TEXT NOT NULL,
    first_breach_at INTEGER,
    fired_at INTEGER,
    resolved_at INTEGER,
    last_value REAL NOT NULL,
    threshold REAL NOT NULL,
    level TEXT NOT NULL,
    message TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_alert_rule_status ON alert_records (rule_id, status);

CREATE TABLE IF NOT EXISTS properties (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    value TEXT NOT NULL
);
"#;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
