// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for Alert Rules and the Alert Records produced by the Alert
//! Rule Engine's firing/resolving state machine (§3, §4.E).

use super::Storage;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRuleRow {
    pub id: String,
    pub agent_id: Option<String>,
    pub monitor_id: Option<String>,
    pub kind: String,
    pub threshold: f64,
    pub op: String,
    pub for_sec: i64,
    pub level: String,
    pub channels: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRecordRow {
    pub id: String,
    pub rule_id: String,
    pub status: String,
    pub first_breach_at: Option<i64>,
    pub fired_at: Option<i64>,
    pub resolved_at: Option<i64>,
    pub last_value: f64,
    pub threshold: f64,
    pub level: String,
    pub message: String,
}

impl Storage {
    pub async fn alert_rule_list(&self) -> anyhow::Result<Vec<AlertRuleRow>> {
        let rows = sqlx::query_as::<_, AlertRuleRow>("SELECT * FROM alert_rules").fetch_all(&self.pool).await?;
        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn alert_rule_upsert(
        &self,
        id: &str,
        agent_id: Option<&str>,
        monitor_id: Option<&str>,
        kind: &str,
        threshold: f64,
        op: &str,
        for_sec: i64,
        level: &str,
        channels_json: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO alert_rules (id, agent_id, monitor_id, kind, threshold, op, for_sec, level, channels)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                agent_id = excluded.agent_id,
                monitor_id = excluded.monitor_id,
                kind = excluded.kind,
                threshold = excluded.threshold,
                op = excluded.op,
                for_sec = excluded.for_sec,
                level = excluded.level,
                channels = excluded.channels",
        )
        .bind(id)
        .bind(agent_id)
        .bind(monitor_id)
        .bind(kind)
        .bind(threshold)
        .bind(op)
        .bind(for_sec)
        .bind(level)
        .bind(channels_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn alert_rule_delete(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM alert_rules WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    /// The active (non-`resolved`) record for a rule, if any. A rule has at
    /// most one open record at a time (§4.E invariant).
    pub async fn alert_record_active(&self, rule_id: &str) -> anyhow::Result<Option<AlertRecordRow>> {
        let row = sqlx::query_as::<_, AlertRecordRow>(
            "SELECT * FROM alert_records WHERE rule_id = ? AND status != 'resolved'
             ORDER BY first_breach_at DESC LIMIT 1",
        )
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn alert_record_upsert(&self, row: &AlertRecordRow) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO alert_records
                (id, rule_id, status, first_breach_at, fired_at, resolved_at, last_value, threshold, level, message)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                first_breach_at = excluded.first_breach_at,
                fired_at = excluded.fired_at,
                resolved_at = excluded.resolved_at,
                last_value = excluded.last_value,
                threshold = excluded.threshold,
                level = excluded.level,
                message = excluded.message",
        )
        .bind(&row.id)
        .bind(&row.rule_id)
        .bind(&row.status)
        .bind(row.first_breach_at)
        .bind(row.fired_at)
        .bind(row.resolved_at)
        .bind(row.last_value)
        .bind(row.threshold)
        .bind(&row.level)
        .bind(&row.message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn alert_records_recent(&self, limit: i64) -> anyhow::Result<Vec<AlertRecordRow>> {
        let rows = sqlx::query_as::<_, AlertRecordRow>(
            "SELECT * FROM alert_records ORDER BY first_breach_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
