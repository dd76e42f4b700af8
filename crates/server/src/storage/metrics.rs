// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for raw metric samples and their rolled-up aggregates (§3,
//! §4.B). The ingestor owns the write path; uptime and range-query
//! consumers read the aggregate table.

use super::Storage;
use crate::time::Resolution;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AggregateRow {
    pub agent_id: String,
    pub kind: String,
    pub subject: String,
    pub resolution: String,
    pub bucket_start: i64,
    pub min_value: f64,
    pub max_value: f64,
    pub sum_value: f64,
    pub count: i64,
    pub rate_max: Option<f64>,
}

impl Storage {
    /// Append a raw sample. Duplicate `(agent_id, kind, subject, ts_ms)`
    /// tuples are idempotent overwrites (§7, at-least-once agent delivery).
    pub async fn raw_sample_insert(
        &self,
        agent_id: &str,
        kind: &str,
        subject: &str,
        ts_ms: i64,
        fields_json: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO raw_metric_samples (agent_id, kind, subject, ts_ms, fields)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(agent_id, kind, subject, ts_ms) DO UPDATE SET fields = excluded.fields",
        )
        .bind(agent_id)
        .bind(kind)
        .bind(subject)
        .bind(ts_ms)
        .bind(fields_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert an aggregate bucket, merging min/max/sum/count with whatever
    /// is already on disk. Callers pass the merged values; this is a plain
    /// replace, not a read-modify-write, because the in-process aggregator
    /// holds the authoritative open-window state (§4.B) and only flushes
    /// closed windows here.
    #[allow(clippy::too_many_arguments)]
    pub async fn aggregate_upsert(
        &self,
        agent_id: &str,
        kind: &str,
        subject: &str,
        resolution: Resolution,
        bucket_start: i64,
        min_value: f64,
        max_value: f64,
        sum_value: f64,
        count: i64,
        rate_max: Option<f64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO metric_aggregates
                (agent_id, kind, subject, resolution, bucket_start, min_value, max_value, sum_value, count, rate_max)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(agent_id, kind, subject, resolution, bucket_start) DO UPDATE SET
                min_value = excluded.min_value,
                max_value = excluded.max_value,
                sum_value = excluded.sum_value,
                count = excluded.count,
                rate_max = excluded.rate_max",
        )
        .bind(agent_id)
        .bind(kind)
        .bind(subject)
        .bind(resolution.as_str())
        .bind(bucket_start)
        .bind(min_value)
        .bind(max_value)
        .bind(sum_value)
        .bind(count)
        .bind(rate_max)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn aggregate_range(
        &self,
        agent_id: &str,
        kind: &str,
        subject: &str,
        resolution: Resolution,
        from_ms: i64,
        to_ms: i64,
    ) -> anyhow::Result<Vec<AggregateRow>> {
        let rows = sqlx::query_as::<_, AggregateRow>(
            "SELECT * FROM metric_aggregates
             WHERE agent_id = ? AND kind = ? AND subject = ? AND resolution = ?
               AND bucket_start >= ? AND bucket_start < ?
             ORDER BY bucket_start ASC",
        )
        .bind(agent_id)
        .bind(kind)
        .bind(subject)
        .bind(resolution.as_str())
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete up to `limit` aggregate rows whose bucket falls entirely
    /// before `cutoff_ms` (§3 retention: 7d/30d/365d for 1m/5m/1h
    /// respectively). Batched so a single sweep cannot monopolize the pool
    /// (§4.B "deletion is batched, ≤10k rows/batch").
    pub async fn aggregate_prune_before_batch(
        &self,
        resolution: Resolution,
        cutoff_ms: i64,
        limit: i64,
    ) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "DELETE FROM metric_aggregates WHERE rowid IN (
                SELECT rowid FROM metric_aggregates WHERE resolution = ? AND bucket_start < ? LIMIT ?
            )",
        )
        .bind(resolution.as_str())
        .bind(cutoff_ms)
        .bind(limit)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Raw samples are only kept long enough to feed the open aggregation
    /// window; prune anything older than the retention bound, batched like
    /// [`Self::aggregate_prune_before_batch`].
    pub async fn raw_sample_prune_before_batch(&self, cutoff_ms: i64, limit: i64) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "DELETE FROM raw_metric_samples WHERE rowid IN (
                SELECT rowid FROM raw_metric_samples WHERE ts_ms < ? LIMIT ?
            )",
        )
        .bind(cutoff_ms)
        .bind(limit)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
