// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for the Agent entity (§3). The Agent Link Manager exclusively
//! owns `last_seen_at`/`status`; the administrative collaborator owns the
//! rest and is out of scope here — we only persist what A needs to recover
//! state across restarts.

use super::Storage;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgentRow {
    pub id: String,
    pub api_key: String,
    pub name: String,
    pub hostname: String,
    pub ip: String,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub location: String,
    pub status: i64,
    pub last_seen_at: i64,
}

impl Storage {
    /// Upsert an agent on handshake, preserving administrator-owned
    /// descriptive fields if the row already exists and the new value is empty.
    pub async fn agent_upsert_handshake(
        &self,
        id: &str,
        api_key: &str,
        hostname: &str,
        ip: &str,
        os: &str,
        arch: &str,
        version: &str,
        location: &str,
        now_ms: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO agents (id, api_key, hostname, ip, os, arch, version, location, status, last_seen_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
             ON CONFLICT(id) DO UPDATE SET
                hostname = excluded.hostname,
                ip = excluded.ip,
                os = excluded.os,
                arch = excluded.arch,
                version = excluded.version,
                location = excluded.location,
                status = 1,
                last_seen_at = excluded.last_seen_at",
        )
        .bind(id)
        .bind(api_key)
        .bind(hostname)
        .bind(ip)
        .bind(os)
        .bind(arch)
        .bind(version)
        .bind(location)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn agent_touch(&self, id: &str, now_ms: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE agents SET last_seen_at = ?, status = 1 WHERE id = ?")
            .bind(now_ms)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn agent_mark_offline(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE agents SET status = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn agent_get(&self, id: &str) -> anyhow::Result<Option<AgentRow>> {
        let row = sqlx::query_as::<_, AgentRow>("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn agent_find_by_api_key(&self, api_key: &str) -> anyhow::Result<Option<AgentRow>> {
        let row = sqlx::query_as::<_, AgentRow>("SELECT * FROM agents WHERE api_key = ?")
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
