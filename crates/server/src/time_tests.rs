// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bucket_start_boundary_close() {
    // 59.999s, 60.000s, 60.001s of an hour into a 1m series (scenario 4).
    let one_min = resolution_ms(Resolution::OneMinute);
    assert_eq!(bucket_start(59_999, one_min), 0);
    assert_eq!(bucket_start(60_000, one_min), 60_000);
    assert_eq!(bucket_start(60_001, one_min), 60_000);
}

#[test]
fn bucket_start_five_minute() {
    let five_min = resolution_ms(Resolution::FiveMinutes);
    assert_eq!(bucket_start(299_999, five_min), 0);
    assert_eq!(bucket_start(300_000, five_min), 300_000);
}

#[test]
fn resolution_round_trip_str() {
    assert_eq!(Resolution::OneMinute.as_str(), "1m");
    assert_eq!(Resolution::FiveMinutes.as_str(), "5m");
    assert_eq!(Resolution::OneHour.as_str(), "1h");
}

#[test]
fn retention_bounds_match_spec() {
    assert_eq!(Resolution::OneMinute.retention_ms(), 7 * 24 * 3_600_000);
    assert_eq!(Resolution::FiveMinutes.retention_ms(), 30 * 24 * 3_600_000);
    assert_eq!(Resolution::OneHour.retention_ms(), 365 * 24 * 3_600_000);
}
