// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component B — Metric Ingestor & Aggregator (§4.B). Validates and
//! persists raw telemetry, maintains tumbling-window aggregates at 1m/5m/1h
//! resolution, and serves range queries plus a latest-value overlay.

pub mod aggregator;
pub mod overlay;
pub mod range_query;
pub mod retention;
pub mod validate;
pub mod writer;

use std::sync::Arc;

use crate::agent_link::session::TelemetrySample;
use crate::error::PikaError;
use crate::state::AppState;
use crate::time::epoch_ms;

/// The closed set of recognized telemetry kinds (§3, §6).
pub const KNOWN_KINDS: &[&str] =
    &["cpu", "memory", "disk", "disk_io", "network", "gpu", "temperature", "host", "load"];

/// Entry point called by the Agent Link Manager's per-session consumer for
/// every `telemetry` frame (§4.A → §4.B handoff).
pub async fn handle_telemetry(
    state: &Arc<AppState>,
    agent_id: &str,
    kind: &str,
    samples: Vec<TelemetrySample>,
) -> Result<(), PikaError> {
    let now = epoch_ms();
    validate::validate_kind(kind)?;

    for sample in samples {
        if let Err(e) = validate::validate_timestamp(sample.timestamp, now) {
            tracing::warn!(agent_id, kind, err = %e, "dropping out-of-range telemetry sample");
            continue;
        }

        let subject = sample.subject.clone().unwrap_or_default();
        let fields_json = serde_json::to_string(&sample.fields).unwrap_or_else(|_| "{}".to_owned());

        state.writer.submit(writer::RawSampleJob {
            agent_id: agent_id.to_owned(),
            kind: kind.to_owned(),
            subject: subject.clone(),
            ts_ms: sample.timestamp,
            fields_json,
        });

        if let Some((value, is_rate)) = validate::extract_scalar(kind, &sample.fields) {
            state.overlay.record(agent_id, kind, &subject, sample.timestamp, value).await;

            let closed = state.aggregator.ingest_sample(
                agent_id,
                kind,
                &subject,
                sample.timestamp,
                value,
                is_rate,
            );
            for bucket in closed {
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
                    tracing::error!(err = %e, "failed to persist closed aggregate bucket");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
