// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw storage backing the Property Store Facade (§4.G). The façade layer
//! (`crate::property`) owns typed decode/encode; this module is pure
//! key-value persistence.

use super::Storage;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PropertyRow {
    pub id: String,
    pub name: String,
    pub value: String,
}

impl Storage {
    pub async fn property_get(&self, id: &str) -> anyhow::Result<Option<PropertyRow>> {
        let row = sqlx::query_as::<_, PropertyRow>(
            "SELECT id, name, value FROM properties WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn property_set(&self, id: &str, name: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO properties (id, name, value) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, value = excluded.value",
        )
        .bind(id)
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn property_delete(&self, id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM properties WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }
}
