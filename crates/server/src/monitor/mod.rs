// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor Scheduler & Probe Coordinator (§4.C): dispatches `probe`
//! commands, reduces `checkResult` frames to a per-tick Monitor Verdict,
//! and drives the per-monitor `unknown -> up | down` state machine.

pub mod consensus;
pub mod coordinator;
pub mod probe_selection;
pub mod state_machine;

use std::sync::Arc;

use crate::agent_link::session::CheckResultFrame;
use crate::error::PikaError;
use crate::state::AppState;
use crate::storage::monitors::CheckResultRow;

pub use coordinator::{spawn, Coordinator};

/// Handle one inbound `checkResult` frame: persist it unconditionally (it
/// is part of the historical record regardless of whether a tick is still
/// collecting, §3 "Immutable, one row per probe per tick") and forward it
/// to the monitor's in-flight tick, if any.
pub async fn handle_check_result(
    state: &Arc<AppState>,
    agent_id: &str,
    frame: CheckResultFrame,
) -> Result<(), PikaError> {
    let row = CheckResultRow {
        monitor_id: frame.monitor_id.clone(),
        agent_id: agent_id.to_owned(),
        started_at: frame.started_at,
        latency_ms: frame.latency_ms,
        status: frame.status.clone(),
        http_code: frame.http_code,
        tls_expiry_at: frame.tls_expiry_at,
        error: frame.error.clone(),
    };
    // A failed insert here is a transient persistence error (§7 category 1),
    // not a process-fatal condition — the session and the server both stay up.
    state.storage.check_result_insert(&row).await.map_err(|e| PikaError::Transient(e.to_string()))?;
    state.monitor_coordinator.forward(&frame.monitor_id, agent_id, frame).await;
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
