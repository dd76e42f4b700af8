// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;
use crate::config::PikaConfig;
use crate::storage::Storage;

async fn test_state() -> Arc<AppState> {
    let storage = Storage::connect_in_memory().await.expect("storage");
    Arc::new(AppState::new(PikaConfig::for_test(), storage))
}

async fn cpu_rule(state: &AppState, for_sec: i64, level: &str) -> AlertRuleRow {
    let id = "rule-cpu".to_owned();
    state
        .storage
        .alert_rule_upsert(&id, Some("agent-1"), None, "cpu", 80.0, ">", for_sec, level, "[]")
        .await
        .expect("upsert rule");
    state.storage.alert_rule_list().await.expect("list").into_iter().find(|r| r.id == id).expect("rule present")
}

#[tokio::test]
async fn scenario_1_firing_and_resolve_with_sustain() {
    let state = test_state().await;
    let rule = cpu_rule(&state, 60, "warning").await;

    // t=0 usage=70 (no breach)
    state.overlay.record("agent-1", "cpu", "", 0, 70.0).await;
    evaluate_rule(&state, &rule, 0).await;
    assert!(state.storage.alert_record_active(&rule.id).await.unwrap().is_none());

    // t=10 usage=85, first breach
    state.overlay.record("agent-1", "cpu", "", 10_000, 85.0).await;
    evaluate_rule(&state, &rule, 10_000).await;
    assert!(state.storage.alert_record_active(&rule.id).await.unwrap().is_none(), "not sustained yet");

    // Continued breach through t=60; not yet fired (needs >= 60s from first breach at t=10)
    for t in [20, 30, 40, 50, 60] {
        state.overlay.record("agent-1", "cpu", "", t * 1000, 85.0).await;
        evaluate_rule(&state, &rule, t * 1000).await;
    }
    assert!(state.storage.alert_record_active(&rule.id).await.unwrap().is_none());

    // t=70: 70-10=60 >= forSec(60) -> fires
    state.overlay.record("agent-1", "cpu", "", 70_000, 85.0).await;
    evaluate_rule(&state, &rule, 70_000).await;
    let record = state.storage.alert_record_active(&rule.id).await.unwrap().expect("firing");
    assert_eq!(record.status, "firing");
    assert_eq!(record.first_breach_at, Some(10_000));

    // t=100: usage drops to 50, resolves
    state.overlay.record("agent-1", "cpu", "", 100_000, 50.0).await;
    evaluate_rule(&state, &rule, 100_000).await;
    let record = state.storage.alert_record_active(&rule.id).await.unwrap();
    assert!(record.is_none(), "no active record after resolve");
    let recent = state.storage.alert_records_recent(10).await.unwrap();
    assert_eq!(recent[0].status, "resolved");
}

#[tokio::test]
async fn scenario_2_dedup_under_flapping() {
    let state = test_state().await;
    let rule = cpu_rule(&state, 60, "warning").await;

    // Oscillate 85/70 every 15s; no 60s sustained breach.
    let mut t = 0i64;
    for i in 0..8 {
        let value = if i % 2 == 0 { 85.0 } else { 70.0 };
        state.overlay.record("agent-1", "cpu", "", t * 1000, value).await;
        evaluate_rule(&state, &rule, t * 1000).await;
        t += 15;
    }

    assert!(state.storage.alert_record_active(&rule.id).await.unwrap().is_none());
    assert!(state.storage.alert_records_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn level_escalation_upgrades_without_duplicate_firing() {
    let state = test_state().await;
    let rule = cpu_rule(&state, 0, "warning").await;

    state.overlay.record("agent-1", "cpu", "", 0, 85.0).await;
    evaluate_rule(&state, &rule, 0).await;
    let fired = state.storage.alert_record_active(&rule.id).await.unwrap().expect("fired");
    assert_eq!(fired.level, "warning");

    // Rule is reconfigured to critical while still firing.
    state
        .storage
        .alert_rule_upsert(&rule.id, Some("agent-1"), None, "cpu", 80.0, ">", 0, "critical", "[]")
        .await
        .unwrap();
    let escalated_rule =
        state.storage.alert_rule_list().await.unwrap().into_iter().find(|r| r.id == rule.id).unwrap();

    evaluate_rule(&state, &escalated_rule, 1_000).await;
    let record = state.storage.alert_record_active(&rule.id).await.unwrap().expect("still firing");
    assert_eq!(record.level, "critical");
    assert_eq!(record.id, fired.id, "same record, upgraded in place");

    let all = state.storage.alert_records_recent(10).await.unwrap();
    assert_eq!(all.len(), 1, "no duplicate firing record created");
}

#[tokio::test]
async fn scenario_6_offline_transition_fires_network_alert() {
    let state = test_state().await;
    let id = "rule-net".to_owned();
    state.storage.alert_rule_upsert(&id, Some("agent-1"), None, "network", 0.0, ">", 5, "critical", "[]").await.unwrap();

    // Agent starts online (session present and online).
    let session = crate::agent_link::session::AgentSession::new(
        "agent-1".into(),
        "key".into(),
        crate::agent_link::session::AgentMeta::default(),
        0,
    );
    state.sessions.insert_preempting(session.clone()).await;

    notify_agent_online(&state, "agent-1", 0).await;
    assert!(state.storage.alert_record_active(&id).await.unwrap().is_none());

    // t0+90s: sweeper marks it offline.
    session.mark_offline();
    notify_agent_offline(&state, "agent-1", 90_000).await;
    // forSec=5, first breach at t=90_000: not sustained yet on this same call.
    assert!(state.storage.alert_record_active(&id).await.unwrap().is_none());

    // A later eager check past forSec sustains the breach.
    notify_agent_offline(&state, "agent-1", 96_000).await;
    let record = state.storage.alert_record_active(&id).await.unwrap().expect("fired");
    assert_eq!(record.status, "firing");
}

#[tokio::test]
async fn deleted_rule_auto_resolves_firing_record() {
    let state = test_state().await;
    let rule = cpu_rule(&state, 0, "warning").await;
    state.overlay.record("agent-1", "cpu", "", 0, 85.0).await;
    evaluate_rule(&state, &rule, 0).await;
    assert!(state.storage.alert_record_active(&rule.id).await.unwrap().is_some());

    state.storage.alert_rule_delete(&rule.id).await.unwrap();
    run_tick(&state).await;

    let recent = state.storage.alert_records_recent(10).await.unwrap();
    assert_eq!(recent[0].status, "resolved");
    assert!(recent[0].message.contains("rule_removed"));
}

#[tokio::test]
async fn cert_rule_fires_on_expiry_within_threshold() {
    let state = test_state().await;
    state
        .storage
        .monitor_upsert("mon-1", "tls", "example.com:443", 60, 5000, "", "{\"mode\":\"all\"}", Some(10))
        .await
        .unwrap();
    let id = "rule-cert".to_owned();
    state.storage.alert_rule_upsert(&id, None, Some("mon-1"), "cert", 30.0, "<=", 0, "warning", "[]").await.unwrap();
    let rule = state.storage.alert_rule_list().await.unwrap().into_iter().find(|r| r.id == id).unwrap();

    evaluate_rule(&state, &rule, 0).await;
    let record = state.storage.alert_record_active(&id).await.unwrap().expect("fired");
    assert_eq!(record.last_value, 10.0);
}

#[tokio::test]
async fn service_rule_does_not_fire_on_unknown_verdict() {
    let state = test_state().await;
    let id = "rule-svc".to_owned();
    state.storage.alert_rule_upsert(&id, None, Some("mon-1"), "service", 0.0, ">", 0, "critical", "[]").await.unwrap();
    let rule = state.storage.alert_rule_list().await.unwrap().into_iter().find(|r| r.id == id).unwrap();

    // verdicts.previous defaults to Unknown for a monitor never seen.
    evaluate_rule(&state, &rule, 0).await;
    assert!(state.storage.alert_record_active(&id).await.unwrap().is_none());

    state.verdicts.apply("mon-1", ProbeStatus::Down).await;
    evaluate_rule(&state, &rule, 1_000).await;
    assert!(state.storage.alert_record_active(&id).await.unwrap().is_some());
}
