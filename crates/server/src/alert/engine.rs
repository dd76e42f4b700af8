// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The evaluation tick, sustain-window bookkeeping, and firing/resolving
//! state machine for Alert Rules (§4.E).
//!
//! `run_tick` is the periodic (10 s) pass over every rule. `notify_*` are
//! eager, narrowly-scoped re-evaluations triggered by liveness and monitor
//! transition events (§4.A, §4.C) so a rule doesn't have to wait a full
//! tick to observe a state change its own trigger already knows about —
//! both paths share [`evaluate_rule`], so the result is identical either
//! way (Testable Property: consensus determinism extends to alert
//! evaluation being a pure function of current observable state).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::events::{AlertEventPayload, AlertNotificationEvent, MonitorTransitionEvent};
use crate::monitor::consensus::ProbeStatus;
use crate::state::AppState;
use crate::storage::alerts::{AlertRecordRow, AlertRuleRow};
use crate::time::epoch_ms;

/// Per-rule sustain-window bookkeeping plus the outbound notification
/// channel consumed by the Notification Dispatcher (§4.F). Does not
/// survive restart — an acceptable trade-off for the single-node, non-HA
/// scope (documented in DESIGN.md).
pub struct AlertRuntime {
    sustain: Mutex<HashMap<String, i64>>,
    tx: mpsc::UnboundedSender<AlertNotificationEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<AlertNotificationEvent>>>,
}

impl AlertRuntime {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { sustain: Mutex::new(HashMap::new()), tx, rx: Mutex::new(Some(rx)) }
    }

    /// Take ownership of the event receiver. `None` if already taken — the
    /// Notification Dispatcher is the single consumer, meant to take it once
    /// at startup.
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<AlertNotificationEvent>> {
        self.rx.try_lock().ok().and_then(|mut guard| guard.take())
    }
}

impl Default for AlertRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn level_rank(level: &str) -> u8 {
    match level {
        "critical" => 2,
        "warning" => 1,
        _ => 0,
    }
}

fn compare(actual: f64, op: &str, threshold: f64) -> bool {
    match op {
        ">" => actual > threshold,
        ">=" | "\u{2265}" => actual >= threshold,
        "<" => actual < threshold,
        "<=" | "\u{2264}" => actual <= threshold,
        _ => false,
    }
}

fn parse_channels(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// What was observed for a rule this evaluation, and whether it breaches.
struct Observation {
    actual: f64,
    breach: bool,
}

/// Pull the observable named by the rule's `kind` (§4.E step 1) and decide
/// breach (§4.E step 2). `None` means "no data yet" — the rule is skipped
/// this pass without disturbing its sustain window.
async fn observe(state: &Arc<AppState>, rule: &AlertRuleRow) -> Option<Observation> {
    match rule.kind.as_str() {
        // Resource kinds read the overlay's aggregate-subject ("") latest
        // value. Alert Rule's `network` kind is distinct from the
        // telemetry `network` kind below — it names agent liveness
        // (§4.A/§4.E step 1: "for network rules, the agent's online flag
        // from A"), not bandwidth.
        "cpu" | "memory" | "disk" => {
            let agent_id = rule.agent_id.as_deref()?;
            let latest = state.overlay.get(agent_id, &rule.kind, "").await?;
            let breach = compare(latest.value, &rule.op, rule.threshold);
            Some(Observation { actual: latest.value, breach })
        }
        "cert" => {
            let monitor_id = rule.monitor_id.as_deref()?;
            let monitor = state.storage.monitor_get(monitor_id).await.ok()??;
            let days = monitor.cert_expiry_days?;
            let actual = days as f64;
            let breach = compare(actual, &rule.op, rule.threshold);
            Some(Observation { actual, breach })
        }
        "service" => {
            let monitor_id = rule.monitor_id.as_deref()?;
            let verdict = state.verdicts.previous(monitor_id).await;
            // Open Question decision (DESIGN.md): service alerts fire only
            // on `down`, never on `unknown`.
            let breach = verdict == ProbeStatus::Down;
            let actual = if breach { 1.0 } else { 0.0 };
            Some(Observation { actual, breach })
        }
        "network" => {
            let agent_id = rule.agent_id.as_deref()?;
            let online = state.sessions.get(agent_id).await.map(|s| s.is_online()).unwrap_or(false);
            let breach = !online;
            let actual = if breach { 1.0 } else { 0.0 };
            Some(Observation { actual, breach })
        }
        _ => None,
    }
}

fn render_message(rule: &AlertRuleRow, actual: f64) -> String {
    format!("{} {} {} {} (rule {})", rule.kind, actual, rule.op, rule.threshold, rule.id)
}

/// Evaluate one rule against current state, applying the sustain and
/// firing/resolving lifecycle (§4.E steps 3-4). Emits a notification event
/// on the runtime's channel when a record is created, resolved, or its
/// level escalates.
pub async fn evaluate_rule(state: &Arc<AppState>, rule: &AlertRuleRow, now: i64) {
    let Some(observation) = observe(state, rule).await else { return };
    let runtime = &state.alert_runtime;

    let active = state.storage.alert_record_active(&rule.id).await.ok().flatten();

    if observation.breach {
        let first_breach_at = {
            let mut sustain = runtime.sustain.lock().await;
            *sustain.entry(rule.id.clone()).or_insert(now)
        };

        match active {
            None => {
                if now - first_breach_at >= rule.for_sec * 1000 {
                    fire(state, rule, &observation, first_breach_at, now).await;
                }
            }
            Some(record) => {
                // Still firing: update the observed value and consider
                // level escalation (§4.E: "if actual crosses a higher
                // level threshold... the record's level is upgraded").
                if level_rank(&rule.level) > level_rank(&record.level) {
                    level_up(state, rule, &record, &observation, now).await;
                } else if record.last_value != observation.actual {
                    let mut updated = record;
                    updated.last_value = observation.actual;
                    if let Err(e) = state.storage.alert_record_upsert(&updated).await {
                        tracing::error!(rule_id = %rule.id, err = %e, "failed to refresh firing alert record");
                    }
                }
            }
        }
    } else {
        runtime.sustain.lock().await.remove(&rule.id);
        if let Some(record) = active {
            resolve(state, rule, &record, now, "condition cleared").await;
        }
    }
}

async fn fire(state: &Arc<AppState>, rule: &AlertRuleRow, observation: &Observation, first_breach_at: i64, now: i64) {
    let record = AlertRecordRow {
        id: Uuid::new_v4().to_string(),
        rule_id: rule.id.clone(),
        status: "firing".to_owned(),
        first_breach_at: Some(first_breach_at),
        fired_at: Some(now),
        resolved_at: None,
        last_value: observation.actual,
        threshold: rule.threshold,
        level: rule.level.clone(),
        message: render_message(rule, observation.actual),
    };
    if let Err(e) = state.storage.alert_record_upsert(&record).await {
        tracing::error!(rule_id = %rule.id, err = %e, "failed to persist firing alert record");
        return;
    }
    tracing::info!(rule_id = %rule.id, level = %rule.level, actual = observation.actual, "alert firing");
    emit(state, AlertNotificationEvent::Firing(payload(rule, &record, now)));
}

async fn resolve(state: &Arc<AppState>, rule: &AlertRuleRow, record: &AlertRecordRow, now: i64, _reason: &str) {
    let mut updated = record.clone();
    updated.status = "resolved".to_owned();
    updated.resolved_at = Some(now);
    if let Err(e) = state.storage.alert_record_upsert(&updated).await {
        tracing::error!(rule_id = %rule.id, err = %e, "failed to persist resolved alert record");
        return;
    }
    tracing::info!(rule_id = %rule.id, "alert resolved");
    emit(state, AlertNotificationEvent::Resolved(payload(rule, &updated, now)));
}

async fn level_up(state: &Arc<AppState>, rule: &AlertRuleRow, record: &AlertRecordRow, observation: &Observation, now: i64) {
    let mut updated = record.clone();
    updated.level = rule.level.clone();
    updated.last_value = observation.actual;
    if let Err(e) = state.storage.alert_record_upsert(&updated).await {
        tracing::error!(rule_id = %rule.id, err = %e, "failed to persist level-up alert record");
        return;
    }
    tracing::info!(rule_id = %rule.id, level = %rule.level, "alert level up");
    emit(state, AlertNotificationEvent::LevelUp(payload(rule, &updated, now)));
}

fn payload(rule: &AlertRuleRow, record: &AlertRecordRow, now: i64) -> AlertEventPayload {
    AlertEventPayload {
        record_id: record.id.clone(),
        rule_id: rule.id.clone(),
        agent_id: rule.agent_id.clone(),
        monitor_id: rule.monitor_id.clone(),
        kind: rule.kind.clone(),
        level: record.level.clone(),
        threshold: record.threshold,
        actual: record.last_value,
        message: record.message.clone(),
        at_ms: now,
        channels: parse_channels(&rule.channels),
    }
}

fn emit(state: &Arc<AppState>, event: AlertNotificationEvent) {
    if state.alert_runtime.tx.send(event).is_err() {
        tracing::warn!("alert notification event dropped: dispatcher not listening");
    }
}

/// Spawn the periodic evaluation tick at `config.alert_tick_secs`.
pub fn spawn(state: Arc<AppState>) {
    let interval = state.config.alert_tick_interval();
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }
            run_tick(&state).await;
        }
    });
}

/// The periodic evaluation tick (§4.E): every rule, every 10s by default.
pub async fn run_tick(state: &Arc<AppState>) {
    let now = epoch_ms();
    let rules = match state.storage.alert_rule_list().await {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(err = %e, "alert engine: failed to list rules");
            return;
        }
    };

    for rule in &rules {
        evaluate_rule(state, rule, now).await;
    }

    reconcile_deleted_rules(state, &rules, now).await;
}

/// Auto-resolve any firing record whose rule no longer exists (§4.E
/// de-duplication invariant: "if a rule is deleted while firing, its
/// record is auto-resolved with reason `rule_removed`").
async fn reconcile_deleted_rules(state: &Arc<AppState>, current_rules: &[AlertRuleRow], now: i64) {
    let current_ids: std::collections::HashSet<&str> = current_rules.iter().map(|r| r.id.as_str()).collect();
    let recent = match state.storage.alert_records_recent(1000).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(err = %e, "alert engine: failed to list recent alert records for reconciliation");
            return;
        }
    };

    for record in recent.into_iter().filter(|r| r.status == "firing" && !current_ids.contains(r.rule_id.as_str())) {
        let rule_id = record.rule_id.clone();
        let mut updated = record;
        updated.status = "resolved".to_owned();
        updated.resolved_at = Some(now);
        updated.message = format!("{} (rule_removed)", updated.message);
        if let Err(e) = state.storage.alert_record_upsert(&updated).await {
            tracing::error!(rule_id = %rule_id, err = %e, "failed to auto-resolve orphaned alert record");
            continue;
        }
        state.alert_runtime.sustain.lock().await.remove(&rule_id);
        tracing::info!(rule_id = %rule_id, "alert auto-resolved: rule_removed");
    }
}

/// Eager re-evaluation of `network`-kind rules for one agent, triggered by
/// the Agent Link Manager's liveness sweeper/handshake path (§4.A, §9).
pub async fn notify_agent_offline(state: &Arc<AppState>, agent_id: &str, now: i64) {
    evaluate_matching(state, now, |rule| rule.kind == "network" && rule.agent_id.as_deref() == Some(agent_id)).await;
}

pub async fn notify_agent_online(state: &Arc<AppState>, agent_id: &str, now: i64) {
    evaluate_matching(state, now, |rule| rule.kind == "network" && rule.agent_id.as_deref() == Some(agent_id)).await;
}

/// Eager re-evaluation of `service`-kind rules for one monitor, triggered
/// by a Monitor Verdict state transition (§4.C).
pub async fn notify_monitor_transition(state: &Arc<AppState>, event: MonitorTransitionEvent) {
    evaluate_matching(state, event.at_ms, |rule| {
        rule.kind == "service" && rule.monitor_id.as_deref() == Some(event.monitor_id.as_str())
    })
    .await;
}

async fn evaluate_matching(state: &Arc<AppState>, now: i64, matches: impl Fn(&AlertRuleRow) -> bool) {
    let rules = match state.storage.alert_rule_list().await {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(err = %e, "alert engine: failed to list rules for eager evaluation");
            return;
        }
    };
    for rule in rules.iter().filter(|r| matches(r)) {
        evaluate_rule(state, rule, now).await;
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
