// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tumbling-window aggregation, sharded by FNV hash of the series key
//! (§4.B, §5 "sharded lock keyed by FNV hash modulo 64").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::state::AppState;
use crate::time::{bucket_start, epoch_ms, resolution_ms, Resolution};

const SHARD_COUNT: usize = 64;
const GRACE_MS: i64 = 30_000;
const RESOLUTIONS: [Resolution; 3] = [Resolution::OneMinute, Resolution::FiveMinutes, Resolution::OneHour];
const FLUSH_INTERVAL: Duration = Duration::from_secs(30);

type SeriesKey = (String, String, String);

#[derive(Debug, Clone, Copy)]
struct OpenBucket {
    bucket_start: i64,
    min: f64,
    max: f64,
    sum: f64,
    count: i64,
    rate_max: Option<f64>,
}

impl OpenBucket {
    fn new(bucket_start: i64, value: f64, is_rate: bool) -> Self {
        Self {
            bucket_start,
            min: value,
            max: value,
            sum: value,
            count: 1,
            rate_max: is_rate.then_some(value),
        }
    }

    fn fold(&mut self, value: f64, is_rate: bool) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
        if is_rate {
            self.rate_max = Some(self.rate_max.map_or(value, |m| m.max(value)));
        }
    }
}

#[derive(Default)]
struct SeriesState {
    open: HashMap<Resolution, OpenBucket>,
}

/// A bucket that has closed and is ready to be persisted outside the shard
/// lock (§5: "persistence of a closed bucket happens after lock release").
#[derive(Debug, Clone)]
pub struct ClosedBucket {
    pub agent_id: String,
    pub kind: String,
    pub subject: String,
    pub resolution: Resolution,
    pub bucket_start: i64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: i64,
    pub rate_max: Option<f64>,
}

pub struct Aggregator {
    shards: Vec<Mutex<HashMap<SeriesKey, SeriesState>>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self { shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect() }
    }

    fn shard_for(&self, key: &SeriesKey) -> &Mutex<HashMap<SeriesKey, SeriesState>> {
        &self.shards[fnv1a(key) % SHARD_COUNT]
    }

    /// Fold one scalar sample into all three resolution windows, returning
    /// any buckets that closed as a result (§4.B aggregation).
    pub fn ingest_sample(
        &self,
        agent_id: &str,
        kind: &str,
        subject: &str,
        timestamp: i64,
        value: f64,
        is_rate: bool,
    ) -> Vec<ClosedBucket> {
        let key: SeriesKey = (agent_id.to_owned(), kind.to_owned(), subject.to_owned());
        let mut closed = Vec::new();

        let shard = self.shard_for(&key);
        let mut guard = shard.lock().unwrap_or_else(|e| e.into_inner());
        let state = guard.entry(key.clone()).or_default();

        for resolution in RESOLUTIONS {
            let res_ms = resolution_ms(resolution);
            let target = bucket_start(timestamp, res_ms);

            match state.open.get_mut(&resolution) {
                None => {
                    state.open.insert(resolution, OpenBucket::new(target, value, is_rate));
                }
                Some(bucket) if bucket.bucket_start == target => {
                    bucket.fold(value, is_rate);
                }
                Some(bucket) if target > bucket.bucket_start => {
                    // Window has rolled forward: close the old bucket (late
                    // grace does not apply to the forward direction) and
                    // open a new one at the sample's own target.
                    let old = *bucket;
                    *bucket = OpenBucket::new(target, value, is_rate);
                    closed.push(to_closed(&key, resolution, old));
                }
                Some(bucket) => {
                    // target < bucket.bucket_start: sample belongs to an
                    // already-closed window. Accept only within the grace
                    // window, otherwise drop as late.
                    if bucket.bucket_start - target <= GRACE_MS {
                        // Still within grace: fold into the currently open
                        // bucket rather than resurrecting the closed one.
                        bucket.fold(value, is_rate);
                    }
                    // else: dropped as late (counted by caller via logs).
                }
            }
        }

        drop(guard);
        closed
    }

    /// Force-close any bucket whose window has fully elapsed, even absent a
    /// new sample, so aggregates become visible without waiting on traffic.
    pub fn flush_expired(&self, now_ms: i64) -> Vec<ClosedBucket> {
        let mut closed = Vec::new();
        for shard in &self.shards {
            let mut guard = shard.lock().unwrap_or_else(|e| e.into_inner());
            for (key, state) in guard.iter_mut() {
                let mut to_remove = Vec::new();
                for (resolution, bucket) in state.open.iter() {
                    let res_ms = resolution_ms(*resolution);
                    if now_ms >= bucket.bucket_start + res_ms {
                        to_remove.push(*resolution);
                    }
                }
                for resolution in to_remove {
                    if let Some(bucket) = state.open.remove(&resolution) {
                        closed.push(to_closed(key, resolution, bucket));
                    }
                }
            }
        }
        closed
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn to_closed(key: &SeriesKey, resolution: Resolution, bucket: OpenBucket) -> ClosedBucket {
    ClosedBucket {
        agent_id: key.0.clone(),
        kind: key.1.clone(),
        subject: key.2.clone(),
        resolution,
        bucket_start: bucket.bucket_start,
        min: bucket.min,
        max: bucket.max,
        sum: bucket.sum,
        count: bucket.count,
        rate_max: bucket.rate_max,
    }
}

/// Periodically force-close buckets whose window has fully elapsed, so an
/// agent that stops reporting still gets its final 1m/5m/1h aggregates
/// (§4.B: closes at wall-clock second 60 / :00 / :00, not just on a
/// later-window sample arriving). Mirrors [`crate::ingest::retention::spawn`].
pub fn spawn(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(FLUSH_INTERVAL);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }
            for bucket in state.aggregator.flush_expired(epoch_ms()) {
                if let Err(e) = state
                    .storage
                    .aggregate_upsert(
                        &bucket.agent_id,
                        &bucket.kind,
                        &bucket.subject,
                        bucket.resolution,
                        bucket.bucket_start,
                        bucket.min,
                        bucket.max,
                        bucket.sum,
                        bucket.count,
                        bucket.rate_max,
                    )
                    .await
                {
                    tracing::error!(err = %e, "failed to persist flushed aggregate bucket");
                }
            }
        }
    });
}

fn fnv1a(key: &SeriesKey) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in key.0.bytes().chain(key.1.bytes()).chain(key.2.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash as usize
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;
