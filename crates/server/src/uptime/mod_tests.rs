// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::storage::monitors::VerdictRow;

async fn seed_verdict(storage: &Storage, monitor_id: &str, tick_at: i64, status: &str, min_latency_ms: Option<i64>) {
    storage
        .verdict_insert(&VerdictRow {
            monitor_id: monitor_id.to_owned(),
            tick_at,
            status: status.to_owned(),
            participant_count: 1,
            down_count: if status == "down" { 1 } else { 0 },
            min_latency_ms,
            max_latency_ms: min_latency_ms,
        })
        .await
        .expect("insert verdict");
}

#[tokio::test]
async fn uptime_excludes_unknown_ticks() {
    let storage = Storage::connect_in_memory().await.expect("storage");
    seed_verdict(&storage, "m1", 1_000, "up", Some(10)).await;
    seed_verdict(&storage, "m1", 2_000, "up", Some(20)).await;
    seed_verdict(&storage, "m1", 3_000, "down", None).await;
    seed_verdict(&storage, "m1", 4_000, "unknown", None).await;

    let cache = UptimeCache::new();
    let stats = cache.stats(&storage, "m1", DAY_MS, 5_000).await.expect("stats");
    // 2 up, 1 down, 1 unknown excluded -> 2/3 * 100 = 66.667
    assert!((stats.uptime_pct - 66.667).abs() < 0.01);
}

#[tokio::test]
async fn current_response_is_none_when_last_verdict_is_down() {
    let storage = Storage::connect_in_memory().await.expect("storage");
    seed_verdict(&storage, "m1", 1_000, "up", Some(10)).await;
    seed_verdict(&storage, "m1", 2_000, "down", None).await;

    let cache = UptimeCache::new();
    let stats = cache.stats(&storage, "m1", DAY_MS, 3_000).await.expect("stats");
    assert_eq!(stats.current_response, None);
}

#[tokio::test]
async fn current_response_reflects_latest_up_verdict() {
    let storage = Storage::connect_in_memory().await.expect("storage");
    seed_verdict(&storage, "m1", 1_000, "down", None).await;
    seed_verdict(&storage, "m1", 2_000, "up", Some(42)).await;

    let cache = UptimeCache::new();
    let stats = cache.stats(&storage, "m1", DAY_MS, 3_000).await.expect("stats");
    assert_eq!(stats.current_response, Some(42));
}

#[tokio::test]
async fn stats_are_cached_by_window_end_floor() {
    let storage = Storage::connect_in_memory().await.expect("storage");
    seed_verdict(&storage, "m1", 1_000, "up", Some(10)).await;

    let cache = UptimeCache::new();
    let first = cache.stats(&storage, "m1", DAY_MS, 30_000).await.expect("stats");
    // A new verdict arrives, but within the same 1-minute floor the cached
    // value should still be returned.
    seed_verdict(&storage, "m1", 31_000, "down", None).await;
    let second = cache.stats(&storage, "m1", DAY_MS, 45_000).await.expect("stats");
    assert_eq!(first, second);
}

#[tokio::test]
async fn no_verdicts_yields_zero_uptime() {
    let storage = Storage::connect_in_memory().await.expect("storage");
    let cache = UptimeCache::new();
    let stats = cache.stats(&storage, "m1", DAY_MS, 10_000).await.expect("stats");
    assert_eq!(stats.uptime_pct, 0.0);
    assert_eq!(stats.avg_response_24h, None);
    assert_eq!(stats.current_response, None);
}
