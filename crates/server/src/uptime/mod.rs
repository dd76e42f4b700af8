// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component D — Uptime & SLA Computer (§4.D). A pure derivation over
//! Monitor Verdicts, cached in memory keyed by `(monitorId, windowMs,
//! windowEnd_floor_1min)`.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::storage::Storage;

const DAY_MS: i64 = 24 * 3_600_000;
const ONE_MINUTE_MS: i64 = 60_000;

/// Uptime and response-time statistics for one monitor over one window.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct UptimeStats {
    /// `up_ticks / (up_ticks + down_ticks)` as a percentage to 3 decimals;
    /// `unknown` ticks are excluded from both numerator and denominator.
    pub uptime_pct: f64,
    /// Mean of `minLatency` across `up` verdicts in the trailing 24h,
    /// independent of the requested window.
    pub avg_response_24h: Option<f64>,
    /// The most recent verdict's `minLatency`, or `None` if it was not `up`.
    pub current_response: Option<i64>,
}

type CacheKey = (String, i64, i64);

/// In-memory cache of [`UptimeStats`], keyed by monitor, requested window,
/// and the window end floored to the minute (§4.D).
pub struct UptimeCache {
    cache: RwLock<HashMap<CacheKey, UptimeStats>>,
}

impl UptimeCache {
    pub fn new() -> Self {
        Self { cache: RwLock::new(HashMap::new()) }
    }

    /// Stats for `monitor_id` over the trailing `window_ms`, as of `now_ms`.
    /// Cached by `(monitorId, windowMs, floor_1min(now_ms))`.
    pub async fn stats(
        &self,
        storage: &Storage,
        monitor_id: &str,
        window_ms: i64,
        now_ms: i64,
    ) -> anyhow::Result<UptimeStats> {
        let floor = now_ms - now_ms.rem_euclid(ONE_MINUTE_MS);
        let key: CacheKey = (monitor_id.to_owned(), window_ms, floor);

        if let Some(stats) = self.cache.read().await.get(&key) {
            return Ok(*stats);
        }

        let stats = compute(storage, monitor_id, window_ms, floor).await?;
        self.cache.write().await.insert(key, stats);
        Ok(stats)
    }

    /// Drop cache entries whose window-end predates `older_than_ms`, so the
    /// map doesn't grow unbounded across a long-running process. Swept
    /// alongside the retention sweeper (§4.D expansion).
    pub async fn evict_older_than(&self, older_than_ms: i64) {
        self.cache.write().await.retain(|(_, _, floor), _| *floor >= older_than_ms);
    }
}

impl Default for UptimeCache {
    fn default() -> Self {
        Self::new()
    }
}

async fn compute(storage: &Storage, monitor_id: &str, window_ms: i64, window_end_ms: i64) -> anyhow::Result<UptimeStats> {
    let from_ms = window_end_ms - window_ms;
    let verdicts = storage.verdicts_range(monitor_id, from_ms, window_end_ms).await?;

    let up_ticks = verdicts.iter().filter(|v| v.status == "up").count();
    let down_ticks = verdicts.iter().filter(|v| v.status == "down").count();
    let uptime_pct = if up_ticks + down_ticks == 0 {
        0.0
    } else {
        round3(up_ticks as f64 / (up_ticks + down_ticks) as f64 * 100.0)
    };

    let last_24h = storage.verdicts_range(monitor_id, window_end_ms - DAY_MS, window_end_ms).await?;
    let up_latencies: Vec<i64> =
        last_24h.iter().filter(|v| v.status == "up").filter_map(|v| v.min_latency_ms).collect();
    let avg_response_24h = if up_latencies.is_empty() {
        None
    } else {
        Some(up_latencies.iter().sum::<i64>() as f64 / up_latencies.len() as f64)
    };

    let current_response = storage
        .verdict_latest(monitor_id)
        .await?
        .and_then(|v| if v.status == "up" { v.min_latency_ms } else { None });

    Ok(UptimeStats { uptime_pct, avg_response_24h, current_response })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
