// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hourly retention sweeper (§4.B): deletes rows past their per-resolution
//! bound in throttled batches.

use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;
use crate::time::{epoch_ms, Resolution};

const BATCH_LIMIT: i64 = 10_000;
const RAW_RETENTION_MS: i64 = 2 * 60 * 60 * 1000;
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);
const THROTTLE_SLEEP: Duration = Duration::from_millis(50);

pub fn spawn(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(SWEEP_INTERVAL);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }
            run_once(&state).await;
        }
    });
}

async fn run_once(state: &Arc<AppState>) {
    let now = epoch_ms();

    let raw_cutoff = now - RAW_RETENTION_MS;
    loop {
        match state.storage.raw_sample_prune_before_batch(raw_cutoff, BATCH_LIMIT).await {
            Ok(0) => break,
            Ok(n) => {
                tracing::debug!(deleted = n, "raw sample retention batch");
                tokio::time::sleep(THROTTLE_SLEEP).await;
            }
            Err(e) => {
                tracing::error!(err = %e, "raw sample retention sweep failed");
                break;
            }
        }
    }

    for resolution in [Resolution::OneMinute, Resolution::FiveMinutes, Resolution::OneHour] {
        let cutoff = now - resolution.retention_ms();
        loop {
            match state.storage.aggregate_prune_before_batch(resolution, cutoff, BATCH_LIMIT).await {
                Ok(0) => break,
                Ok(n) => {
                    tracing::debug!(resolution = resolution.as_str(), deleted = n, "aggregate retention batch");
                    tokio::time::sleep(THROTTLE_SLEEP).await;
                }
                Err(e) => {
                    tracing::error!(resolution = resolution.as_str(), err = %e, "aggregate retention sweep failed");
                    break;
                }
            }
        }
    }

    // The uptime cache (§4.D) has no retention bound of its own; piggyback
    // on this sweep's cadence to keep it from growing unboundedly.
    state.uptime_cache.evict_older_than(now - RAW_RETENTION_MS).await;
}
