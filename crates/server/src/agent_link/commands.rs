// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed downstream command verbs (§4.A, §6): `audit`, `reload`, `probe`.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::agent_link::session::AgentSession;
use crate::agent_link::ws::send_command;

/// Request an on-demand host/rootkit audit.
pub async fn audit(session: &Arc<AgentSession>) -> Result<(), ()> {
    send_command(session, &Uuid::new_v4().to_string(), "audit", serde_json::Value::Null).await
}

/// Ask the agent to reload its local configuration.
pub async fn reload(session: &Arc<AgentSession>) -> Result<(), ()> {
    send_command(session, &Uuid::new_v4().to_string(), "reload", serde_json::Value::Null).await
}

/// Dispatch a monitor probe to this agent (§4.C Probe Coordinator).
pub async fn probe(session: &Arc<AgentSession>, monitor_id: &str) -> Result<(), ()> {
    #[derive(Serialize)]
    struct ProbeParams<'a> {
        monitor: &'a str,
    }
    let params = serde_json::to_value(ProbeParams { monitor: monitor_id }).unwrap_or_default();
    send_command(session, &Uuid::new_v4().to_string(), "probe", params).await
}
