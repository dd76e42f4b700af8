// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry validation and scalar extraction (§4.B write path).

use crate::error::PikaError;
use crate::ingest::KNOWN_KINDS;

const FIVE_MIN_MS: i64 = 5 * 60 * 1000;
const ONE_MIN_MS: i64 = 60 * 1000;

pub fn validate_kind(kind: &str) -> Result<(), PikaError> {
    if KNOWN_KINDS.contains(&kind) {
        Ok(())
    } else {
        Err(PikaError::Protocol(format!("unknown telemetry kind: {kind}")))
    }
}

/// A sample's timestamp must fall within `[now-5min, now+1min]` (§4.B).
pub fn validate_timestamp(ts_ms: i64, now_ms: i64) -> Result<(), PikaError> {
    if ts_ms < 0 {
        return Err(PikaError::Protocol("negative timestamp".into()));
    }
    if ts_ms < now_ms - FIVE_MIN_MS || ts_ms > now_ms + ONE_MIN_MS {
        return Err(PikaError::Protocol("timestamp outside accepted window".into()));
    }
    Ok(())
}

/// Pull the representative scalar for a kind's fields, for aggregation and
/// the latest-value overlay. Returns `(value, is_rate_like)`. Kinds with no
/// single representative scalar (`host`) return `None` — they are still
/// persisted as raw samples but excluded from aggregation/overlay.
pub fn extract_scalar(kind: &str, fields: &serde_json::Value) -> Option<(f64, bool)> {
    let get = |name: &str| fields.get(name).and_then(|v| v.as_f64());
    match kind {
        "cpu" => get("usagePercent").map(|v| (v, false)),
        "memory" => get("usagePercent").map(|v| (v, false)),
        "disk" => get("avgUsagePercent").or_else(|| get("usagePercent")).map(|v| (v, false)),
        "disk_io" => {
            let read = get("readRate").unwrap_or(0.0);
            let write = get("writeRate").unwrap_or(0.0);
            Some((read.max(write), true))
        }
        "network" => {
            let sent = get("totalBytesSentRate").or_else(|| get("sentRate")).unwrap_or(0.0);
            let recv = get("totalBytesRecvRate").or_else(|| get("recvRate")).unwrap_or(0.0);
            Some((sent.max(recv), true))
        }
        "gpu" => get("utilization").map(|v| (v, false)),
        "temperature" => get("temperature").map(|v| (v, false)),
        "load" => get("load1").map(|v| (v, false)),
        "host" => None,
        _ => None,
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
