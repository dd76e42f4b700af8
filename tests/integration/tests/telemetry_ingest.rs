// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exercises `ingest::handle_telemetry` itself — the full write path from
//! an inbound frame through validation, the writer pool, the aggregator,
//! and the latest-value overlay.

use pika::agent_link::session::TelemetrySample;
use pika::time::epoch_ms;

#[tokio::test]
async fn accepted_telemetry_updates_the_latest_overlay() {
    let state = pika_integration_tests::test_state().await;
    let now = epoch_ms();
    let samples =
        vec![TelemetrySample { timestamp: now, subject: None, fields: serde_json::json!({ "usagePercent": 42.5 }) }];

    pika::ingest::handle_telemetry(&state, "agent-1", "cpu", samples).await.expect("telemetry accepted");

    let latest = state.overlay.get("agent-1", "cpu", "").await.expect("overlay populated");
    assert_eq!(latest.value, 42.5);
}

#[tokio::test]
async fn stale_timestamp_is_dropped_without_error() {
    let state = pika_integration_tests::test_state().await;
    let now = epoch_ms();
    let stale = now - 6 * 60 * 1000;
    let samples =
        vec![TelemetrySample { timestamp: stale, subject: None, fields: serde_json::json!({ "usagePercent": 99.0 }) }];

    pika::ingest::handle_telemetry(&state, "agent-1", "cpu", samples).await.expect("frame itself is not an error");
    assert!(state.overlay.get("agent-1", "cpu", "").await.is_none());
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
    let state = pika_integration_tests::test_state().await;
    let samples = vec![TelemetrySample { timestamp: epoch_ms(), subject: None, fields: serde_json::json!({}) }];
    let result = pika::ingest::handle_telemetry(&state, "agent-1", "not-a-real-kind", samples).await;
    assert!(result.is_err());
}
