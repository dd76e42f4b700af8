// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler tick and probe coordinator (§4.C). One ticker task
//! dispatches per-monitor fan-outs as independent tasks; verdict reduction
//! for a given monitor happens on exactly one task (§5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};

use crate::agent_link::session::CheckResultFrame;
use crate::monitor::consensus::{consensus_all, consensus_any, consensus_fanout, ProbeStatus};
use crate::monitor::probe_selection::{selected_probes, ProbeSelection};
use crate::state::AppState;
use crate::storage::monitors::{MonitorRow, VerdictRow};
use crate::time::epoch_ms;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Per-monitor in-flight tick bookkeeping: the channel a tick registers to
/// receive `checkResult` frames on, and the next-due schedule.
#[derive(Default)]
pub struct Coordinator {
    pending: RwLock<HashMap<String, mpsc::UnboundedSender<(String, CheckResultFrame)>>>,
    next_due: RwLock<HashMap<String, i64>>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn register(&self, monitor_id: &str) -> mpsc::UnboundedReceiver<(String, CheckResultFrame)> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.write().await.insert(monitor_id.to_owned(), tx);
        rx
    }

    pub(crate) async fn unregister(&self, monitor_id: &str) {
        self.pending.write().await.remove(monitor_id);
    }

    /// Forward a `checkResult` frame to the monitor's in-flight tick, if
    /// one is currently awaiting results. Frames that arrive after a tick's
    /// collection window closed are simply not a participant (§4.C
    /// "non-participants do not vote").
    pub async fn forward(&self, monitor_id: &str, agent_id: &str, frame: CheckResultFrame) {
        if let Some(tx) = self.pending.read().await.get(monitor_id) {
            let _ = tx.send((agent_id.to_owned(), frame));
        }
    }

    /// Whether `monitor_id` is due for a new tick at `now_ms`, advancing its
    /// schedule as a side effect when it is.
    async fn is_due(&self, monitor_id: &str, interval_sec: i64, now_ms: i64) -> bool {
        let mut due = self.next_due.write().await;
        let next = due.entry(monitor_id.to_owned()).or_insert(now_ms);
        if now_ms >= *next {
            *next = now_ms + interval_sec * 1000;
            true
        } else {
            false
        }
    }
}

pub fn spawn(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(TICK_INTERVAL);
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

async fn run_tick(state: &Arc<AppState>) {
    let now = epoch_ms();
    let monitors = match state.storage.monitor_list().await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(err = %e, "monitor scheduler: failed to list monitors");
            return;
        }
    };

    for monitor in monitors {
        if !state.monitor_coordinator.is_due(&monitor.id, monitor.interval_sec, now).await {
            continue;
        }
        let state = Arc::clone(state);
        tokio::spawn(async move {
            run_monitor_tick(&state, monitor, now).await;
        });
    }
}

async fn run_monitor_tick(state: &Arc<AppState>, monitor: MonitorRow, tick_at: i64) {
    let selection = ProbeSelection::parse(&monitor.probe_selection);
    let online = state.sessions.online_ids().await;
    let selected = selected_probes(&selection, &monitor.id, &online, tick_at);

    if selected.is_empty() {
        persist_verdict(state, &monitor, tick_at, ProbeStatus::Unknown, 0, 0, None, None, None).await;
        return;
    }

    let mut rx = state.monitor_coordinator.register(&monitor.id).await;
    for agent_id in &selected {
        if let Some(session) = state.sessions.get(agent_id).await {
            let _ = crate::agent_link::commands::probe(&session, &monitor.id).await;
        }
    }

    let deadline = tokio::time::sleep(Duration::from_millis(monitor.timeout_ms as u64) + Duration::from_secs(2));
    tokio::pin!(deadline);

    let mut results: Vec<(String, CheckResultFrame)> = Vec::new();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            maybe = rx.recv() => match maybe {
                Some(item) => {
                    results.push(item);
                    if results.len() >= selected.len() {
                        break;
                    }
                }
                None => break,
            }
        }
    }
    state.monitor_coordinator.unregister(&monitor.id).await;

    let statuses: Vec<ProbeStatus> = results.iter().map(|(_, f)| ProbeStatus::parse(&f.status)).collect();
    let previous = state.verdicts.previous(&monitor.id).await;
    let verdict = match &selection {
        ProbeSelection::All => consensus_all(&statuses),
        ProbeSelection::Any => consensus_any(&statuses),
        ProbeSelection::List { .. } => consensus_all(&statuses),
        ProbeSelection::Fanout { n } => consensus_fanout(&statuses, *n, previous),
    };

    let down_count = statuses.iter().filter(|s| **s == ProbeStatus::Down).count() as i64;
    let min_latency = results.iter().map(|(_, f)| f.latency_ms).min();
    let max_latency = results.iter().map(|(_, f)| f.latency_ms).max();
    // A TLS expiry within 30 days is surfaced on the monitor row (§4.C).
    let cert_expiry_days = results
        .iter()
        .filter_map(|(_, f)| f.tls_expiry_at)
        .min()
        .map(|expiry_at| ((expiry_at - tick_at) / 86_400_000).max(0))
        .filter(|days| *days <= 30);

    persist_verdict(
        state,
        &monitor,
        tick_at,
        verdict,
        results.len() as i64,
        down_count,
        min_latency,
        max_latency,
        cert_expiry_days,
    )
    .await;

    if let Some(transition) = state.verdicts.apply(&monitor.id, verdict).await {
        let event = crate::events::MonitorTransitionEvent {
            monitor_id: monitor.id.clone(),
            previous: transition.previous.as_str().to_owned(),
            current: transition.current.as_str().to_owned(),
            at_ms: tick_at,
        };
        crate::alert::engine::notify_monitor_transition(state, event).await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn persist_verdict(
    state: &Arc<AppState>,
    monitor: &MonitorRow,
    tick_at: i64,
    status: ProbeStatus,
    participant_count: i64,
    down_count: i64,
    min_latency_ms: Option<i64>,
    max_latency_ms: Option<i64>,
    cert_expiry_days: Option<i64>,
) {
    let row = VerdictRow {
        monitor_id: monitor.id.clone(),
        tick_at,
        status: status.as_str().to_owned(),
        participant_count,
        down_count,
        min_latency_ms,
        max_latency_ms,
    };
    if let Err(e) = state.storage.verdict_insert(&row).await {
        tracing::error!(monitor_id = %monitor.id, err = %e, "failed to persist monitor verdict");
    }
    if let Err(e) = state.storage.monitor_set_last_verdict(&monitor.id, status.as_str()).await {
        tracing::error!(monitor_id = %monitor.id, err = %e, "failed to update monitor last_verdict");
    }
    if cert_expiry_days.is_some() {
        if let Err(e) = state.storage.monitor_set_cert_expiry(&monitor.id, cert_expiry_days).await {
            tracing::error!(monitor_id = %monitor.id, err = %e, "failed to update monitor cert_expiry_days");
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
