// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Range-query read path (§4.B): resolution selection and ascending output.

use crate::storage::metrics::AggregateRow;
use crate::storage::Storage;
use crate::time::Resolution;

const MIN_POINTS: i64 = 60;
const TWO_HOURS_MS: i64 = 2 * 60 * 60 * 1000;

/// Select the coarsest resolution whose buckets cover `to-from` with at
/// least `MIN_POINTS` points, falling back to 1m for short ranges.
pub fn select_resolution(from_ms: i64, to_ms: i64) -> Resolution {
    let span = (to_ms - from_ms).max(0);
    if span <= TWO_HOURS_MS {
        return Resolution::OneMinute;
    }
    for resolution in [Resolution::OneHour, Resolution::FiveMinutes, Resolution::OneMinute] {
        let bucket_ms = crate::time::resolution_ms(resolution);
        if span / bucket_ms >= MIN_POINTS {
            return resolution;
        }
    }
    Resolution::OneMinute
}

/// Serve a range query. Raw samples are never returned to callers (§4.B).
pub async fn query(
    storage: &Storage,
    agent_id: &str,
    kind: &str,
    subject: &str,
    from_ms: i64,
    to_ms: i64,
) -> anyhow::Result<(Resolution, Vec<AggregateRow>)> {
    let resolution = select_resolution(from_ms, to_ms);
    let rows = storage.aggregate_range(agent_id, kind, subject, resolution, from_ms, to_ms).await?;
    Ok((resolution, rows))
}

#[cfg(test)]
#[path = "range_query_tests.rs"]
mod tests;
