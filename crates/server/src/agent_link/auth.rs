// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handshake authorization: API-key verification and per-IP rate limiting
//! of authentication failures (§4.A "Authentication errors are logged and
//! rate-limited (>=1 s between retries from the same IP)", §7.3).

use std::collections::HashMap;
use std::net::IpAddr;

use tokio::sync::Mutex;

use crate::storage::agents::AgentRow;
use crate::storage::Storage;

const RETRY_WINDOW_MS: i64 = 1_000;

/// Outcome of a handshake authorization attempt.
pub enum HandshakeOutcome {
    /// Known key: reuse the existing agent id.
    Known(AgentRow),
    /// Unknown key with a caller-supplied id that has never been seen —
    /// this is the agent's first successful handshake (§3 "created on
    /// first successful handshake").
    NewAgent(String),
    /// Rejected: either no key/id at all, or the supplied id already
    /// belongs to a different stored key (§4.A "a rejected key yields a
    /// terminal error").
    Rejected,
}

/// Resolve a `hello` frame's `(apiKey, agentId?)` against storage.
pub async fn authorize(storage: &Storage, api_key: &str, agent_id_hint: Option<&str>) -> anyhow::Result<HandshakeOutcome> {
    if let Some(row) = storage.agent_find_by_api_key(api_key).await? {
        return Ok(HandshakeOutcome::Known(row));
    }

    let Some(id) = agent_id_hint else {
        return Ok(HandshakeOutcome::Rejected);
    };

    match storage.agent_get(id).await? {
        // The id is already registered under a different key: this is an
        // impersonation attempt, not a first handshake. Reject rather than
        // silently accepting the session under someone else's identity.
        Some(_) => Ok(HandshakeOutcome::Rejected),
        None => Ok(HandshakeOutcome::NewAgent(id.to_owned())),
    }
}

/// Tracks the last rejected-handshake timestamp per source IP so repeated
/// failures from the same address are throttled rather than logged (and
/// re-checked) on every single retry.
#[derive(Default)]
pub struct AuthRateLimiter {
    last_rejection_ms: Mutex<HashMap<IpAddr, i64>>,
}

impl AuthRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejection from `ip` at `now_ms`. Returns `true` if this
    /// rejection should be logged — i.e. at least [`RETRY_WINDOW_MS`] have
    /// elapsed since the last one from the same IP.
    pub async fn should_log(&self, ip: IpAddr, now_ms: i64) -> bool {
        let mut guard = self.last_rejection_ms.lock().await;
        let should_log = match guard.get(&ip) {
            Some(last) => now_ms - last >= RETRY_WINDOW_MS,
            None => true,
        };
        guard.insert(ip, now_ms);
        should_log
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
