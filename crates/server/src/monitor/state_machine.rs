// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-monitor verdict state machine: `unknown -> up | down`; `up <-> down`
//! with no intermediate (§4.C). Also the source of the "previous verdict"
//! used for fanout tie-break.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::monitor::consensus::ProbeStatus;

/// A transition worth telling the Alert Rule Engine about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: ProbeStatus,
    pub current: ProbeStatus,
}

/// Last-known verdict per monitor, kept in memory for fanout tie-break and
/// transition detection.
pub struct VerdictTable {
    inner: RwLock<HashMap<String, ProbeStatus>>,
}

impl VerdictTable {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    /// The monitor's last verdict, `unknown` if it has never reported.
    pub async fn previous(&self, monitor_id: &str) -> ProbeStatus {
        self.inner.read().await.get(monitor_id).copied().unwrap_or(ProbeStatus::Unknown)
    }

    /// Record a new verdict, returning a [`Transition`] only when the status
    /// actually changed (`up <-> down` with no intermediate, or the initial
    /// `unknown -> up|down`).
    pub async fn apply(&self, monitor_id: &str, current: ProbeStatus) -> Option<Transition> {
        let mut map = self.inner.write().await;
        let previous = map.insert(monitor_id.to_owned(), current).unwrap_or(ProbeStatus::Unknown);
        (previous != current).then_some(Transition { previous, current })
    }
}

impl Default for VerdictTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
