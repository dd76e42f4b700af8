// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for Monitors, their CheckResults, and tick-level Verdicts
//! (§3, §4.C). The Monitor Scheduler owns all writes here.

use super::Storage;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonitorRow {
    pub id: String,
    pub kind: String,
    pub target: String,
    pub interval_sec: i64,
    pub timeout_ms: i64,
    pub expected: String,
    pub probe_selection: String,
    pub last_verdict: String,
    pub cert_expiry_days: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckResultRow {
    pub monitor_id: String,
    pub agent_id: String,
    pub started_at: i64,
    pub latency_ms: i64,
    pub status: String,
    pub http_code: Option<i64>,
    pub tls_expiry_at: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerdictRow {
    pub monitor_id: String,
    pub tick_at: i64,
    pub status: String,
    pub participant_count: i64,
    pub down_count: i64,
    pub min_latency_ms: Option<i64>,
    pub max_latency_ms: Option<i64>,
}

impl Storage {
    pub async fn monitor_list(&self) -> anyhow::Result<Vec<MonitorRow>> {
        let rows = sqlx::query_as::<_, MonitorRow>("SELECT * FROM monitors").fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn monitor_get(&self, id: &str) -> anyhow::Result<Option<MonitorRow>> {
        let row = sqlx::query_as::<_, MonitorRow>("SELECT * FROM monitors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn monitor_upsert(
        &self,
        id: &str,
        kind: &str,
        target: &str,
        interval_sec: i64,
        timeout_ms: i64,
        expected: &str,
        probe_selection: &str,
        cert_expiry_days: Option<i64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO monitors (id, kind, target, interval_sec, timeout_ms, expected, probe_selection, cert_expiry_days)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                target = excluded.target,
                interval_sec = excluded.interval_sec,
                timeout_ms = excluded.timeout_ms,
                expected = excluded.expected,
                probe_selection = excluded.probe_selection,
                cert_expiry_days = excluded.cert_expiry_days",
        )
        .bind(id)
        .bind(kind)
        .bind(target)
        .bind(interval_sec)
        .bind(timeout_ms)
        .bind(expected)
        .bind(probe_selection)
        .bind(cert_expiry_days)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn monitor_delete(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM monitors WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn monitor_set_last_verdict(&self, id: &str, verdict: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE monitors SET last_verdict = ? WHERE id = ?")
            .bind(verdict)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn monitor_set_cert_expiry(&self, id: &str, cert_expiry_days: Option<i64>) -> anyhow::Result<()> {
        sqlx::query("UPDATE monitors SET cert_expiry_days = ? WHERE id = ?")
            .bind(cert_expiry_days)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn check_result_insert(&self, row: &CheckResultRow) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO check_results
                (monitor_id, agent_id, started_at, latency_ms, status, http_code, tls_expiry_at, error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(monitor_id, agent_id, started_at) DO UPDATE SET
                latency_ms = excluded.latency_ms,
                status = excluded.status,
                http_code = excluded.http_code,
                tls_expiry_at = excluded.tls_expiry_at,
                error = excluded.error",
        )
        .bind(&row.monitor_id)
        .bind(&row.agent_id)
        .bind(row.started_at)
        .bind(row.latency_ms)
        .bind(&row.status)
        .bind(row.http_code)
        .bind(row.tls_expiry_at)
        .bind(&row.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Check results for a monitor within `[from_ms, to_ms)`, used by the
    /// Uptime & SLA Computer (§4.D).
    pub async fn check_results_range(
        &self,
        monitor_id: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> anyhow::Result<Vec<CheckResultRow>> {
        let rows = sqlx::query_as::<_, CheckResultRow>(
            "SELECT * FROM check_results WHERE monitor_id = ? AND started_at >= ? AND started_at < ?
             ORDER BY started_at ASC",
        )
        .bind(monitor_id)
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn verdict_insert(&self, row: &VerdictRow) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO monitor_verdicts
                (monitor_id, tick_at, status, participant_count, down_count, min_latency_ms, max_latency_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(monitor_id, tick_at) DO UPDATE SET
                status = excluded.status,
                participant_count = excluded.participant_count,
                down_count = excluded.down_count,
                min_latency_ms = excluded.min_latency_ms,
                max_latency_ms = excluded.max_latency_ms",
        )
        .bind(&row.monitor_id)
        .bind(row.tick_at)
        .bind(&row.status)
        .bind(row.participant_count)
        .bind(row.down_count)
        .bind(row.min_latency_ms)
        .bind(row.max_latency_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The most recent verdict for a monitor, regardless of window, used by
    /// the Uptime & SLA Computer's `currentResponse` field (§4.D).
    pub async fn verdict_latest(&self, monitor_id: &str) -> anyhow::Result<Option<VerdictRow>> {
        let row = sqlx::query_as::<_, VerdictRow>(
            "SELECT * FROM monitor_verdicts WHERE monitor_id = ? ORDER BY tick_at DESC LIMIT 1",
        )
        .bind(monitor_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn verdicts_range(
        &self,
        monitor_id: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> anyhow::Result<Vec<VerdictRow>> {
        let rows = sqlx::query_as::<_, VerdictRow>(
            "SELECT * FROM monitor_verdicts WHERE monitor_id = ? AND tick_at >= ? AND tick_at < ?
             ORDER BY tick_at ASC",
        )
        .bind(monitor_id)
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
