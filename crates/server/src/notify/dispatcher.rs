// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool draining [`crate::alert::engine::AlertRuntime`]'s event
//! channel (§4.F, §5): sized by `config.notify_workers`, one shared
//! `reqwest::Client` per worker, no automatic retry on failure.

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::AlertNotificationEvent;
use crate::property::{self, ChannelEntry};
use crate::state::AppState;

use super::channels::{self, DispatchOutcome};
use super::render;

/// Spawn the dispatcher's worker pool. Each worker pulls events from the
/// same channel (work-stealing via `mpsc` fan-out is not needed: a single
/// receiver wrapped in a mutex would serialize workers, so instead we run
/// `config.notify_workers` tasks each doing its own `recv` against a
/// shared `Mutex<Receiver>`).
pub fn spawn(state: Arc<AppState>) {
    let Some(rx) = state.alert_runtime.take_receiver() else {
        tracing::error!("notification dispatcher: alert event receiver already taken, not spawning workers");
        return;
    };
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    for worker_id in 0..state.config.notify_workers.max(1) {
        let state = state.clone();
        let rx = rx.clone();
        let shutdown = state.shutdown.clone();
        tokio::spawn(async move { run_worker(worker_id, state, rx, shutdown).await });
    }
}

async fn run_worker(
    worker_id: usize,
    state: Arc<AppState>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<AlertNotificationEvent>>>,
    shutdown: CancellationToken,
) {
    let client = Client::builder().timeout(std::time::Duration::from_secs(10)).build().unwrap_or_default();

    loop {
        let event = {
            let mut guard = rx.lock().await;
            tokio::select! {
                _ = shutdown.cancelled() => None,
                event = guard.recv() => event,
            }
        };
        let Some(event) = event else { break };
        dispatch_event(&client, &state, &event).await;
    }
    tracing::debug!(worker_id, "notification dispatcher worker stopped");
}

async fn dispatch_event(client: &Client, state: &Arc<AppState>, event: &AlertNotificationEvent) {
    let payload = event.payload();
    let message = render::render(event);

    let config = match property::notification_channels(&state.storage).await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(rule_id = %payload.rule_id, err = %e, "failed to load notification channels");
            return;
        }
    };

    let targets: Vec<&ChannelEntry> = config
        .channels
        .iter()
        .filter(|entry| entry.enabled && payload.channels.iter().any(|name| name == entry.config.type_name()))
        .collect();

    for entry in targets {
        let outcome = channels::send(client, &entry.config, &message).await;
        log_outcome(&payload.rule_id, &outcome);
    }
}

fn log_outcome(rule_id: &str, outcome: &DispatchOutcome) {
    if outcome.ok {
        tracing::info!(rule_id, channel = outcome.channel_type, "notification dispatched");
    } else {
        tracing::warn!(rule_id, channel = outcome.channel_type, detail = %outcome.detail, "notification dispatch failed");
    }
}

/// Operator-visible test operation (§4.F: `testChannel(type)`): sends a
/// canned message using the stored config for every enabled channel whose
/// type matches, and returns per-channel status.
pub async fn test_channel(state: &Arc<AppState>, channel_type: &str) -> anyhow::Result<Vec<DispatchOutcome>> {
    let client = Client::builder().timeout(std::time::Duration::from_secs(10)).build()?;
    let config = property::notification_channels(&state.storage).await?;
    let matches: Vec<&ChannelEntry> =
        config.channels.iter().filter(|entry| entry.config.type_name() == channel_type).collect();

    if matches.is_empty() {
        return Ok(vec![DispatchOutcome {
            channel_type: channel_type_static(channel_type),
            ok: false,
            detail: format!("no configured channel of type {channel_type}"),
        }]);
    }

    let mut outcomes = Vec::with_capacity(matches.len());
    for entry in matches {
        let outcome = channels::send(&client, &entry.config, "Pika test notification").await;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// `DispatchOutcome::channel_type` is `&'static str`; map a caller-supplied
/// type name to one of the known static labels, falling back to a generic
/// marker for an unrecognized type.
fn channel_type_static(channel_type: &str) -> &'static str {
    match channel_type {
        "dingtalk" => "dingtalk",
        "wecom" => "wecom",
        "feishu" => "feishu",
        "webhook" => "webhook",
        "email" => "email",
        _ => "unknown",
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
