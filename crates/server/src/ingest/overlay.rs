// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-blocking latest-value overlay (§4.B, §5 "last-writer-wins on
//! `(agentId,kind,subject)` ordered by timestamp").

use std::collections::HashMap;

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
pub struct LatestValue {
    pub value: f64,
    pub timestamp: i64,
}

/// `(agentId, kind, subject) -> latestValue`, read by the Alert Rule Engine
/// and any `/latest` style query.
pub struct LatestOverlay {
    map: RwLock<HashMap<(String, String, String), LatestValue>>,
}

impl LatestOverlay {
    pub fn new() -> Self {
        Self { map: RwLock::new(HashMap::new()) }
    }

    /// Record a sample if it is not older than whatever is already stored
    /// (monotonicity invariant, §8).
    pub async fn record(&self, agent_id: &str, kind: &str, subject: &str, timestamp: i64, value: f64) {
        let key = (agent_id.to_owned(), kind.to_owned(), subject.to_owned());
        let mut map = self.map.write().await;
        let should_write = match map.get(&key) {
            Some(existing) => timestamp >= existing.timestamp,
            None => true,
        };
        if should_write {
            map.insert(key, LatestValue { value, timestamp });
        }
    }

    pub async fn get(&self, agent_id: &str, kind: &str, subject: &str) -> Option<LatestValue> {
        let key = (agent_id.to_owned(), kind.to_owned(), subject.to_owned());
        self.map.read().await.get(&key).copied()
    }
}

impl Default for LatestOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
