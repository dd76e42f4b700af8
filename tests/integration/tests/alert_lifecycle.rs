// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end coverage of §8 scenarios 1, 2, and 6: telemetry flowing
//! through the ingest overlay into the Alert Rule Engine's firing and
//! resolving lifecycle.

use pika::agent_link::session::{AgentMeta, AgentSession};
use pika::alert::engine::{evaluate_rule, notify_agent_offline, notify_agent_online};
use pika::time::epoch_ms;

/// Scenario timestamps run well past `ingest::handle_telemetry`'s
/// accepted `[now-5min, now+1min]` window (the scenarios themselves span
/// more than a minute of simulated time), so samples are fed directly
/// through the overlay the Alert Rule Engine actually reads — the same
/// sink `handle_telemetry` itself writes to for a `cpu` sample.
async fn feed_cpu(state: &std::sync::Arc<pika::state::AppState>, agent_id: &str, ts_ms: i64, usage_percent: f64) {
    state.overlay.record(agent_id, "cpu", "", ts_ms, usage_percent).await;
}

#[tokio::test]
async fn scenario_1_cpu_rule_fires_then_resolves_end_to_end() {
    let state = pika_integration_tests::test_state().await;
    let base = epoch_ms();
    let rule_id = "cpu-rule".to_owned();
    state
        .storage
        .alert_rule_upsert(&rule_id, Some("agent-1"), None, "cpu", 80.0, ">", 60, "warning", "[]")
        .await
        .expect("create rule");
    let rule = state.storage.alert_rule_list().await.unwrap().into_iter().find(|r| r.id == rule_id).unwrap();

    feed_cpu(&state, "agent-1", base, 70.0).await;
    evaluate_rule(&state, &rule, base).await;
    assert!(state.storage.alert_record_active(&rule_id).await.unwrap().is_none());

    feed_cpu(&state, "agent-1", base + 10_000, 85.0).await;
    evaluate_rule(&state, &rule, base + 10_000).await;

    for t_sec in [20, 30, 40, 50, 60, 70] {
        feed_cpu(&state, "agent-1", base + t_sec * 1000, 85.0).await;
        evaluate_rule(&state, &rule, base + t_sec * 1000).await;
    }

    let record = state.storage.alert_record_active(&rule_id).await.unwrap().expect("fired by t=70");
    assert_eq!(record.status, "firing");

    feed_cpu(&state, "agent-1", base + 100_000, 50.0).await;
    evaluate_rule(&state, &rule, base + 100_000).await;
    assert!(state.storage.alert_record_active(&rule_id).await.unwrap().is_none());

    let recent = state.storage.alert_records_recent(10).await.unwrap();
    assert_eq!(recent[0].status, "resolved");
}

#[tokio::test]
async fn scenario_2_flapping_cpu_never_sustains_a_firing_record() {
    let state = pika_integration_tests::test_state().await;
    let base = epoch_ms();
    let rule_id = "cpu-flap".to_owned();
    state
        .storage
        .alert_rule_upsert(&rule_id, Some("agent-1"), None, "cpu", 80.0, ">", 60, "warning", "[]")
        .await
        .expect("create rule");
    let rule = state.storage.alert_rule_list().await.unwrap().into_iter().find(|r| r.id == rule_id).unwrap();

    let mut t = 0i64;
    for i in 0..8 {
        let usage = if i % 2 == 0 { 85.0 } else { 70.0 };
        feed_cpu(&state, "agent-1", base + t * 1000, usage).await;
        evaluate_rule(&state, &rule, base + t * 1000).await;
        t += 15;
    }

    assert!(state.storage.alert_record_active(&rule_id).await.unwrap().is_none());
    assert!(state.storage.alert_records_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn scenario_6_agent_goes_offline_and_network_alert_fires() {
    let state = pika_integration_tests::test_state().await;
    let base = epoch_ms();
    let rule_id = "net-rule".to_owned();
    state
        .storage
        .alert_rule_upsert(&rule_id, Some("agent-1"), None, "network", 0.0, ">", 5, "critical", "[]")
        .await
        .expect("create rule");

    let session = AgentSession::new("agent-1".to_owned(), "key".to_owned(), AgentMeta::default(), base);
    state.sessions.insert_preempting(session.clone()).await;
    notify_agent_online(&state, "agent-1", base).await;
    assert!(state.storage.alert_record_active(&rule_id).await.unwrap().is_none());

    // t0+90s: simulate the liveness sweeper's transition.
    session.mark_offline();
    notify_agent_offline(&state, "agent-1", base + 90_000).await;
    assert!(state.storage.alert_record_active(&rule_id).await.unwrap().is_none(), "not sustained yet");

    notify_agent_offline(&state, "agent-1", base + 96_000).await;
    let record = state.storage.alert_record_active(&rule_id).await.unwrap().expect("fired after forSec");
    assert_eq!(record.status, "firing");
}
