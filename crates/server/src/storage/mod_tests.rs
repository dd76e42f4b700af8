// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::time::Resolution;

#[tokio::test]
async fn connect_in_memory_applies_schema() {
    let storage = Storage::connect_in_memory().await.expect("connect");
    // Schema applied idempotently: a second call on the same pool must not error.
    storage.migrate().await.expect("idempotent migrate");
}

#[tokio::test]
async fn agent_upsert_then_get_round_trips() {
    let storage = Storage::connect_in_memory().await.expect("connect");
    storage
        .agent_upsert_handshake("a1", "key1", "host1", "10.0.0.1", "linux", "x86_64", "1.0.0", "dc1", 1_000)
        .await
        .expect("upsert");
    let row = storage.agent_get("a1").await.expect("get").expect("present");
    assert_eq!(row.hostname, "host1");
    assert_eq!(row.status, 1);
    assert_eq!(row.last_seen_at, 1_000);
}

#[tokio::test]
async fn agent_mark_offline_clears_status_only() {
    let storage = Storage::connect_in_memory().await.expect("connect");
    storage
        .agent_upsert_handshake("a1", "key1", "host1", "10.0.0.1", "linux", "x86_64", "1.0.0", "dc1", 1_000)
        .await
        .expect("upsert");
    storage.agent_mark_offline("a1").await.expect("mark offline");
    let row = storage.agent_get("a1").await.expect("get").expect("present");
    assert_eq!(row.status, 0);
    assert_eq!(row.last_seen_at, 1_000);
}

#[tokio::test]
async fn aggregate_upsert_is_idempotent_replace() {
    let storage = Storage::connect_in_memory().await.expect("connect");
    storage
        .aggregate_upsert("a1", "cpu", "", Resolution::OneMinute, 60_000, 10.0, 20.0, 150.0, 10, None)
        .await
        .expect("insert");
    storage
        .aggregate_upsert("a1", "cpu", "", Resolution::OneMinute, 60_000, 5.0, 25.0, 200.0, 12, None)
        .await
        .expect("replace");
    let rows = storage
        .aggregate_range("a1", "cpu", "", Resolution::OneMinute, 0, 120_000)
        .await
        .expect("range");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].min_value, 5.0);
    assert_eq!(rows[0].count, 12);
}

#[tokio::test]
async fn aggregate_range_is_ascending_by_bucket_start() {
    let storage = Storage::connect_in_memory().await.expect("connect");
    for bucket in [180_000, 60_000, 120_000] {
        storage
            .aggregate_upsert("a1", "cpu", "", Resolution::OneMinute, bucket, 1.0, 2.0, 3.0, 1, None)
            .await
            .expect("insert");
    }
    let rows = storage
        .aggregate_range("a1", "cpu", "", Resolution::OneMinute, 0, 300_000)
        .await
        .expect("range");
    let starts: Vec<i64> = rows.iter().map(|r| r.bucket_start).collect();
    assert_eq!(starts, vec![60_000, 120_000, 180_000]);
}

#[tokio::test]
async fn property_get_set_round_trips() {
    let storage = Storage::connect_in_memory().await.expect("connect");
    storage.property_set("system_config", "system_config", "{\"displayName\":\"Pika\"}").await.expect("set");
    let row = storage.property_get("system_config").await.expect("get").expect("present");
    assert_eq!(row.value, "{\"displayName\":\"Pika\"}");

    storage.property_set("system_config", "system_config", "{\"displayName\":\"Pika2\"}").await.expect("update");
    let row = storage.property_get("system_config").await.expect("get").expect("present");
    assert_eq!(row.value, "{\"displayName\":\"Pika2\"}");
}

#[tokio::test]
async fn alert_record_active_ignores_resolved() {
    let storage = Storage::connect_in_memory().await.expect("connect");
    storage
        .alert_rule_upsert("r1", Some("a1"), None, "cpu", 80.0, ">", 60, "warning", "[]")
        .await
        .expect("rule upsert");
    storage
        .alert_record_upsert(&alerts::AlertRecordRow {
            id: "rec1".into(),
            rule_id: "r1".into(),
            status: "resolved".into(),
            first_breach_at: Some(0),
            fired_at: Some(10_000),
            resolved_at: Some(20_000),
            last_value: 85.0,
            threshold: 80.0,
            level: "warning".into(),
            message: "cleared".into(),
        })
        .await
        .expect("insert resolved");
    assert!(storage.alert_record_active("r1").await.expect("query").is_none());
}
