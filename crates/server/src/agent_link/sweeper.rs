// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic liveness sweep: transitions stale sessions to `offline` (§4.A).

use std::sync::Arc;

use crate::state::AppState;
use crate::time::epoch_ms;

/// Spawn the background sweeper. Runs every `sweep_interval_secs`; any
/// session whose `last_seen_at` exceeds `offline_threshold_secs` is marked
/// offline and an `agent.offline` event is emitted for the Alert Engine.
pub fn spawn(state: Arc<AppState>) {
    let interval = state.config.sweep_interval();
    let threshold = state.config.offline_threshold();

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let now = epoch_ms();
            for session in state.sessions.snapshot().await {
                if !session.is_online() {
                    continue;
                }
                let elapsed_ms = now - session.last_seen_at();
                if elapsed_ms >= threshold.as_millis() as i64 {
                    session.mark_offline();
                    if let Err(e) = state.storage.agent_mark_offline(&session.id).await {
                        tracing::warn!(agent_id = %session.id, err = %e, "failed to persist offline status");
                    }
                    tracing::info!(agent_id = %session.id, "agent transitioned to offline");
                    crate::alert::engine::notify_agent_offline(&state, &session.id, now).await;
                }
            }
        }
    });
}
