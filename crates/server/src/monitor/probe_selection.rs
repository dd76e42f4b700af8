// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolving a Monitor's `probeSelection` to the set of eligible and
//! selected probes for one tick (§4.C).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProbeSelection {
    All,
    Any,
    List { agents: Vec<String> },
    Fanout { n: usize },
}

impl ProbeSelection {
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or(ProbeSelection::All)
    }
}

/// Eligible probes: online agents intersected with the monitor's allow-list
/// for `list`, or all online agents for `all`/`any`/`fanout`.
pub fn eligible(selection: &ProbeSelection, online: &[String]) -> Vec<String> {
    match selection {
        ProbeSelection::List { agents } => {
            online.iter().filter(|id| agents.contains(id)).cloned().collect()
        }
        ProbeSelection::All | ProbeSelection::Any | ProbeSelection::Fanout { .. } => online.to_vec(),
    }
}

/// `rotationEpoch` advances every 24 h so fanout locality doesn't go stale
/// (§4.C). Derived from wall clock, never persisted.
pub fn rotation_epoch(now_ms: i64) -> i64 {
    now_ms / 86_400_000
}

/// Select `n` probes from `eligible` by consistent hashing over
/// `(monitorId, rotationEpoch, agentId)`.
pub fn fanout_select(monitor_id: &str, rotation_epoch: i64, eligible: &[String], n: usize) -> Vec<String> {
    let mut ranked: Vec<(u64, &String)> = eligible
        .iter()
        .map(|agent_id| (fnv1a_str(&format!("{monitor_id}:{rotation_epoch}:{agent_id}")), agent_id))
        .collect();
    ranked.sort_by_key(|(hash, id)| (*hash, (*id).clone()));
    ranked.into_iter().take(n).map(|(_, id)| id.clone()).collect()
}

/// Probes to actually dispatch `command(probe)` to this tick, given the
/// selection mode.
pub fn selected_probes(selection: &ProbeSelection, monitor_id: &str, online: &[String], now_ms: i64) -> Vec<String> {
    let pool = eligible(selection, online);
    match selection {
        ProbeSelection::Fanout { n } => fanout_select(monitor_id, rotation_epoch(now_ms), &pool, *n),
        _ => pool,
    }
}

fn fnv1a_str(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
#[path = "probe_selection_tests.rs"]
mod tests;
