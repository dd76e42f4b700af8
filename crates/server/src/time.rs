// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Epoch-millisecond time helpers shared by every subsystem.
//!
//! All persisted time fields are epoch milliseconds (§6); bucket math is
//! done in this unit so aggregator, uptime, and retention sweeps agree.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as epoch milliseconds.
pub fn epoch_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

/// Floor `ts_ms` to the start of the `resolution_ms` bucket containing it.
///
/// A `resolution_ms=R` bucket covers `[bucketStart, bucketStart+R)`.
pub fn bucket_start(ts_ms: i64, resolution_ms: i64) -> i64 {
    ts_ms.div_euclid(resolution_ms) * resolution_ms
}

/// Milliseconds in the given resolution tag.
pub fn resolution_ms(resolution: Resolution) -> i64 {
    match resolution {
        Resolution::OneMinute => 60_000,
        Resolution::FiveMinutes => 300_000,
        Resolution::OneHour => 3_600_000,
    }
}

/// Aggregation resolutions (§3, Aggregated Metric).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::OneHour => "1h",
        }
    }

    /// Retention bound in milliseconds for this resolution (§3).
    pub fn retention_ms(&self) -> i64 {
        match self {
            Self::OneMinute => 7 * 24 * 3_600_000,
            Self::FiveMinutes => 30 * 24 * 3_600_000,
            Self::OneHour => 365 * 24 * 3_600_000,
        }
    }
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
