// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Internal event types that tie the pipeline stages together (§2 data
//! flow, §9 "cyclic references resolved by message passing").

use serde::{Deserialize, Serialize};

/// Emitted by the Agent Link Manager's sweeper and handshake path,
/// consumed by the Alert Rule Engine for `network`-kind rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentLivenessEvent {
    Offline { agent_id: String, at_ms: i64 },
    Online { agent_id: String, at_ms: i64 },
}

/// Emitted by the Monitor Scheduler on a verdict state transition,
/// consumed by the Alert Rule Engine for `service`-kind rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorTransitionEvent {
    pub monitor_id: String,
    pub previous: String,
    pub current: String,
    pub at_ms: i64,
}

/// The three notification-worthy lifecycle moments of an Alert Record
/// (§4.E / §4.F), emitted by the Alert Rule Engine on its channel and
/// drained by the Notification Dispatcher's worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlertNotificationEvent {
    Firing(AlertEventPayload),
    Resolved(AlertEventPayload),
    LevelUp(AlertEventPayload),
}

impl AlertNotificationEvent {
    pub fn payload(&self) -> &AlertEventPayload {
        match self {
            Self::Firing(p) | Self::Resolved(p) | Self::LevelUp(p) => p,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEventPayload {
    pub record_id: String,
    pub rule_id: String,
    pub agent_id: Option<String>,
    pub monitor_id: Option<String>,
    pub kind: String,
    pub level: String,
    pub threshold: f64,
    pub actual: f64,
    pub message: String,
    pub at_ms: i64,
    pub channels: Vec<String>,
}
