// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent session state and the bounded single-consumer inbound queue
//! (§4.A, §5 "no cross-session locks on the hot path").

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify, RwLock};
use tokio_util::sync::CancellationToken;

use crate::time::epoch_ms;

/// Depth of the per-session inbound queue (§4.A).
pub const INBOUND_QUEUE_DEPTH: usize = 128;

#[derive(Debug, Clone)]
pub struct TelemetrySample {
    pub timestamp: i64,
    pub subject: Option<String>,
    pub fields: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CheckResultFrame {
    pub monitor_id: String,
    pub started_at: i64,
    pub latency_ms: i64,
    pub status: String,
    pub http_code: Option<i64>,
    pub tls_expiry_at: Option<i64>,
    pub error: Option<String>,
}

/// A normalized inbound frame, post wire-format parsing (§6).
#[derive(Debug, Clone)]
pub enum InboundFrame {
    Telemetry { kind: String, samples: Vec<TelemetrySample> },
    CheckResult(CheckResultFrame),
}

impl InboundFrame {
    fn is_telemetry(&self) -> bool {
        matches!(self, InboundFrame::Telemetry { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AgentMeta {
    pub hostname: String,
    pub ip: String,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub location: String,
}

/// A duplex session for one connected agent.
pub struct AgentSession {
    pub id: String,
    pub api_key: String,
    pub meta: RwLock<AgentMeta>,
    pub last_seen_at: AtomicI64,
    pub online: AtomicBool,
    /// Cancelled when this session is superseded or disconnects.
    pub cancel: CancellationToken,
    /// Count of telemetry frames dropped for queue overflow (§4.A).
    pub loss_counter: AtomicU64,
    inbound: std::sync::Mutex<VecDeque<InboundFrame>>,
    inbound_notify: Notify,
    /// Outbound text-frame sink, set once the WebSocket is attached.
    outbound: RwLock<Option<mpsc::UnboundedSender<String>>>,
}

impl AgentSession {
    pub fn new(id: String, api_key: String, meta: AgentMeta, now_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            id,
            api_key,
            meta: RwLock::new(meta),
            last_seen_at: AtomicI64::new(now_ms),
            online: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            loss_counter: AtomicU64::new(0),
            inbound: std::sync::Mutex::new(VecDeque::with_capacity(INBOUND_QUEUE_DEPTH)),
            inbound_notify: Notify::new(),
            outbound: RwLock::new(None),
        })
    }

    /// Any inbound frame updates liveness (§4.A: "liveness is driven by
    /// frames, not a separate heartbeat").
    pub fn touch(&self) {
        self.last_seen_at.store(epoch_ms(), Ordering::Relaxed);
        self.online.store(true, Ordering::Relaxed);
    }

    pub fn last_seen_at(&self) -> i64 {
        self.last_seen_at.load(Ordering::Relaxed)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn mark_offline(&self) {
        self.online.store(false, Ordering::Relaxed);
    }

    /// Enqueue a frame, applying the overflow policy: drop the oldest
    /// telemetry frame to make room; never drop a `checkResult` frame.
    pub fn enqueue(&self, frame: InboundFrame) {
        let mut queue = self.inbound.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= INBOUND_QUEUE_DEPTH {
            if let Some(pos) = queue.iter().position(InboundFrame::is_telemetry) {
                queue.remove(pos);
                self.loss_counter.fetch_add(1, Ordering::Relaxed);
            } else if frame.is_telemetry() {
                // Queue is saturated with checkResult frames; drop this
                // telemetry frame instead of growing unboundedly.
                self.loss_counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
            // else: frame is a checkResult and none could be evicted — grow
            // past the soft depth rather than drop it.
        }
        queue.push_back(frame);
        drop(queue);
        self.inbound_notify.notify_one();
    }

    /// Await and pop the next queued frame. Single-consumer by contract.
    pub async fn dequeue(&self) -> InboundFrame {
        loop {
            {
                let mut queue = self.inbound.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(frame) = queue.pop_front() {
                    return frame;
                }
            }
            self.inbound_notify.notified().await;
        }
    }

    pub async fn attach_outbound(&self, tx: mpsc::UnboundedSender<String>) {
        *self.outbound.write().await = Some(tx);
    }

    pub async fn detach_outbound(&self) {
        *self.outbound.write().await = None;
    }

    /// Best-effort send of a raw JSON text frame downstream. Returns `false`
    /// if no transport is currently attached or the send failed.
    pub async fn try_send(&self, text: String) -> bool {
        let guard = self.outbound.read().await;
        match guard.as_ref() {
            Some(tx) => tx.send(text).is_ok(),
            None => false,
        }
    }
}

/// The full set of connected agent sessions (§9 "per-agent session table").
#[derive(Default)]
pub struct SessionTable {
    inner: RwLock<HashMap<String, Arc<AgentSession>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<Arc<AgentSession>> {
        self.inner.read().await.get(id).cloned()
    }

    /// Insert a session, preempting (cancelling) any prior session with the
    /// same agent id (§4.A "identity collisions... preempt the prior
    /// session").
    pub async fn insert_preempting(&self, session: Arc<AgentSession>) {
        let mut table = self.inner.write().await;
        if let Some(prev) = table.insert(session.id.clone(), session) {
            prev.cancel.cancel();
        }
    }

    pub async fn remove(&self, id: &str) {
        self.inner.write().await.remove(id);
    }

    pub async fn snapshot(&self) -> Vec<Arc<AgentSession>> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn online_ids(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .values()
            .filter(|s| s.is_online())
            .map(|s| s.id.clone())
            .collect()
    }
}
