// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport for the agent duplex link (§6 "Agent ↔ Server
//! frames").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::agent_link::auth::{self, HandshakeOutcome};
use crate::agent_link::session::{AgentMeta, AgentSession, CheckResultFrame, InboundFrame, TelemetrySample};
use crate::state::AppState;
use crate::time::epoch_ms;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum WireFrame {
    Hello {
        #[serde(rename = "apiKey")]
        api_key: String,
        #[serde(rename = "agentId")]
        agent_id: Option<String>,
        meta: WireMeta,
    },
    Telemetry {
        kind: String,
        samples: Vec<WireSample>,
    },
    #[serde(rename = "checkResult")]
    CheckResult {
        #[serde(rename = "monitorId")]
        monitor_id: String,
        #[serde(rename = "startedAt")]
        started_at: i64,
        #[serde(rename = "latencyMs")]
        latency_ms: i64,
        status: String,
        #[serde(rename = "httpCode")]
        http_code: Option<i64>,
        #[serde(rename = "tlsExpiryAt")]
        tls_expiry_at: Option<i64>,
        error: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct WireMeta {
    hostname: String,
    ip: String,
    os: String,
    arch: String,
    version: String,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Deserialize)]
struct WireSample {
    timestamp: i64,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    fields: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct HelloAck {
    #[serde(rename = "agentId")]
    agent_id: String,
    #[serde(rename = "serverTime")]
    server_time: i64,
}

/// `GET /ws/agent` — duplex upgrade for an agent connection.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, peer))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, peer: SocketAddr) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let hello = match ws_rx.next().await {
        Some(Ok(Message::Text(text))) => text,
        _ => return,
    };

    let (api_key, agent_id_hint, meta) = match serde_json::from_str::<WireFrame>(&hello) {
        Ok(WireFrame::Hello { api_key, agent_id, meta }) => (api_key, agent_id, meta),
        _ => {
            tracing::warn!("agent link: first frame was not hello");
            return;
        }
    };

    // Authorization errors close the session but are not fatal to the
    // server; repeated rejections from the same IP are throttled to one
    // log line per second (§4.A, §7.3) regardless of how fast the client
    // retries.
    let outcome = match auth::authorize(&state.storage, &api_key, agent_id_hint.as_deref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(err = %e, "agent link: handshake lookup failed");
            return;
        }
    };

    let agent_id = match outcome {
        HandshakeOutcome::Known(row) => row.id,
        HandshakeOutcome::NewAgent(id) => id,
        HandshakeOutcome::Rejected => {
            let now = epoch_ms();
            if state.auth_rate_limiter.should_log(peer.ip(), now).await {
                tracing::warn!(ip = %peer.ip(), "agent link: handshake rejected (unknown or impersonated identity)");
            }
            return;
        }
    };

    let now = epoch_ms();
    if let Err(e) = state
        .storage
        .agent_upsert_handshake(
            &agent_id,
            &api_key,
            &meta.hostname,
            &meta.ip,
            &meta.os,
            &meta.arch,
            &meta.version,
            &meta.location,
            now,
        )
        .await
    {
        tracing::error!(agent_id = %agent_id, err = %e, "agent link: failed to persist handshake");
        return;
    }

    let session = AgentSession::new(
        agent_id.clone(),
        api_key,
        AgentMeta {
            hostname: meta.hostname,
            ip: meta.ip,
            os: meta.os,
            arch: meta.arch,
            version: meta.version,
            location: meta.location,
        },
        now,
    );
    state.sessions.insert_preempting(Arc::clone(&session)).await;
    crate::alert::engine::notify_agent_online(&state, &agent_id, now).await;

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    session.attach_outbound(out_tx).await;

    let ack = HelloAck { agent_id: agent_id.clone(), server_time: now };
    if let Ok(text) = serde_json::to_string(&ack) {
        let _ = ws_tx.send(Message::Text(text.into())).await;
    }

    // Consumer task: drains the session's bounded inbound queue independently
    // of the socket recv loop (§4.A, §5 "no cross-session locks on the hot
    // path").
    let consumer_state = Arc::clone(&state);
    let consumer_session = Arc::clone(&session);
    let consumer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = consumer_session.cancel.cancelled() => break,
                frame = consumer_session.dequeue() => {
                    dispatch_frame(&consumer_state, &consumer_session.id, frame).await;
                }
            }
        }
    });

    let cancel = session.cancel.clone();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = state.shutdown.cancelled() => break,

            outbound = out_rx.recv() => {
                match outbound {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        session.touch();
                        match serde_json::from_str::<WireFrame>(&text) {
                            Ok(WireFrame::Telemetry { kind, samples }) => {
                                session.enqueue(InboundFrame::Telemetry {
                                    kind,
                                    samples: samples
                                        .into_iter()
                                        .map(|s| TelemetrySample {
                                            timestamp: s.timestamp,
                                            subject: s.subject,
                                            fields: s.fields,
                                        })
                                        .collect(),
                                });
                            }
                            Ok(WireFrame::CheckResult {
                                monitor_id,
                                started_at,
                                latency_ms,
                                status,
                                http_code,
                                tls_expiry_at,
                                error,
                            }) => {
                                session.enqueue(InboundFrame::CheckResult(CheckResultFrame {
                                    monitor_id,
                                    started_at,
                                    latency_ms,
                                    status,
                                    http_code,
                                    tls_expiry_at,
                                    error,
                                }));
                            }
                            Ok(WireFrame::Hello { .. }) => {
                                tracing::debug!(agent_id = %session.id, "ignoring re-hello on live session");
                            }
                            Err(e) => {
                                tracing::warn!(agent_id = %session.id, err = %e, "dropping malformed frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    consumer.abort();
    session.detach_outbound().await;
    session.mark_offline();
    // Only clear the table entry if this session wasn't already preempted by
    // a newer connection for the same agent id.
    if let Some(current) = state.sessions.get(&session.id).await {
        if Arc::ptr_eq(&current, &session) {
            state.sessions.remove(&session.id).await;
        }
    }
}

async fn dispatch_frame(state: &Arc<AppState>, agent_id: &str, frame: InboundFrame) {
    match frame {
        InboundFrame::Telemetry { kind, samples } => {
            if let Err(e) = crate::ingest::handle_telemetry(state, agent_id, &kind, samples).await {
                tracing::warn!(agent_id, kind, err = %e, "telemetry frame rejected");
            }
        }
        InboundFrame::CheckResult(result) => {
            if let Err(e) = crate::monitor::handle_check_result(state, agent_id, result).await {
                tracing::warn!(agent_id, err = %e, "checkResult frame rejected");
            }
        }
    }
}

/// Send a `command` frame to the given agent, retrying once after 1 s on
/// failure (§4.A downstream command delivery).
pub async fn send_command(
    session: &Arc<AgentSession>,
    id: &str,
    verb: &str,
    params: serde_json::Value,
) -> Result<(), ()> {
    #[derive(Serialize)]
    struct CommandFrame<'a> {
        #[serde(rename = "type")]
        kind: &'static str,
        id: &'a str,
        verb: &'a str,
        params: serde_json::Value,
    }

    let frame = CommandFrame { kind: "command", id, verb, params: params.clone() };
    let Ok(text) = serde_json::to_string(&frame) else { return Err(()) };

    if session.try_send(text.clone()).await {
        return Ok(());
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    if session.try_send(text).await {
        Ok(())
    } else {
        tracing::warn!(agent_id = %session.id, command_id = id, "command.failed after retry");
        Err(())
    }
}
