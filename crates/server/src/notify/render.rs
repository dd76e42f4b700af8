// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text message template for alert notifications (§4.F, §6): a
//! deterministic function of event kind, agent, and record.

use crate::events::{AlertEventPayload, AlertNotificationEvent};

fn verb(event: &AlertNotificationEvent) -> &'static str {
    match event {
        AlertNotificationEvent::Firing(_) => "FIRING",
        AlertNotificationEvent::Resolved(_) => "RESOLVED",
        AlertNotificationEvent::LevelUp(_) => "LEVEL UP",
    }
}

fn subject(payload: &AlertEventPayload) -> &str {
    payload.agent_id.as_deref().or(payload.monitor_id.as_deref()).unwrap_or("unknown")
}

/// Render the plain-text message dispatched to every channel for `event`.
pub fn render(event: &AlertNotificationEvent) -> String {
    let payload = event.payload();
    format!(
        "[{}][{}] {} on {}: actual={} threshold={} (rule {})",
        verb(event),
        payload.level,
        payload.kind,
        subject(payload),
        payload.actual,
        payload.threshold,
        payload.rule_id,
    )
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
